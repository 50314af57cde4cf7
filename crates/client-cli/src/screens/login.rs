use anyhow::Result;
use tokio::io::AsyncBufRead;

use super::{dim, failure, heading, notice, success, Console};
use crate::app::App;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choice {
    LoggedIn,
    Register,
    Quit,
}

pub async fn show<R: AsyncBufRead + Unpin>(app: &mut App, console: &mut Console<R>) -> Result<Choice> {
    heading("🔐 PrimeField Login");
    loop {
        println!("  1) Login");
        println!("  2) Register as new staff");
        println!("  3) Quit");
        match console.prompt("Select").await?.to_ascii_lowercase().as_str() {
            "1" | "login" => {
                if attempt(app, console).await? {
                    return Ok(Choice::LoggedIn);
                }
            }
            "2" | "register" => return Ok(Choice::Register),
            "3" | "q" | "quit" => return Ok(Choice::Quit),
            _ => notice("Please choose 1, 2 or 3"),
        }
    }
}

async fn attempt<R: AsyncBufRead + Unpin>(app: &mut App, console: &mut Console<R>) -> Result<bool> {
    let user_name = console.prompt("Staff ID / Email").await?;
    let password = console.prompt("Password").await?;

    dim("Signing in...");
    match app.login(&user_name, &password).await {
        Ok(session) => {
            success("Login successful!");
            dim(&format!("User ID: {}", session.user_id));
            Ok(true)
        }
        Err(e) => {
            tracing::debug!("Login failed: {:?}", e);
            let (title, message) = e.login_copy();
            failure(title, &message);
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn app(base_url: String) -> App {
        let mut config = Config::default();
        config.backend.base_url = base_url;
        App::new(config).unwrap()
    }

    #[tokio::test]
    async fn test_failed_login_returns_to_menu() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/SignInService/signInProcess")
            .with_status(200)
            .with_body(r#"{"messageCode":"1","messageDesc":"Invalid user"}"#)
            .expect(1)
            .create_async()
            .await;
        let mut app = app(server.url());
        let mut console = Console::new(&b"1\nST42\nbad\n2\n"[..]);
        assert_eq!(show(&mut app, &mut console).await.unwrap(), Choice::Register);
        assert!(!app.sessions().is_logged_in());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_successful_login() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/SignInService/signInProcess")
            .with_status(200)
            .with_body(r#"{"messageCode":"0","sessionID":"S1","userID":"U1","companyID":"100"}"#)
            .create_async()
            .await;
        let mut app = app(server.url());
        let mut console = Console::new(&b"x\n1\nST42\nsecret\n"[..]);
        assert_eq!(show(&mut app, &mut console).await.unwrap(), Choice::LoggedIn);
        assert!(app.sessions().is_logged_in());
    }
}
