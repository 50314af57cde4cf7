//! Line-oriented terminal screens: login, registration, dashboard and the
//! service report form. Each screen reads from a shared [`Console`] and
//! prints to stdout; logs go to stderr.

pub mod dashboard;
pub mod login;
pub mod registration;
pub mod report;

use std::io::Write;

use anyhow::Result;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines, Stdin};

use crate::app::App;

/// Stdin reached end of file
#[derive(Debug, Error)]
#[error("Input closed")]
pub struct InputClosed;

pub struct Console<R = BufReader<Stdin>> {
    lines: Lines<R>,
}

impl Console {
    pub fn stdin() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()))
    }
}

impl<R: AsyncBufRead + Unpin> Console<R> {
    pub fn new(reader: R) -> Self {
        Self { lines: reader.lines() }
    }

    /// Next raw line; `None` at end of input. Cancel safe, so it can sit in
    /// a `select!` next to a timer.
    pub async fn next_line(&mut self) -> Result<Option<String>> {
        Ok(self.lines.next_line().await?)
    }

    pub async fn prompt(&mut self, label: &str) -> Result<String> {
        print!("{}: ", label);
        std::io::stdout().flush()?;
        match self.next_line().await? {
            Some(line) => Ok(line.trim().to_string()),
            None => Err(InputClosed.into()),
        }
    }

    /// Prompt showing the current value; an empty answer keeps it
    pub async fn prompt_default(&mut self, label: &str, current: &str) -> Result<String> {
        if current.is_empty() {
            return self.prompt(label).await;
        }
        let answer = self.prompt(&format!("{} [{}]", label, current)).await?;
        Ok(if answer.is_empty() { current.to_string() } else { answer })
    }

    pub async fn confirm(&mut self, question: &str) -> Result<bool> {
        let answer = self.prompt(&format!("{} (y/n)", question)).await?;
        Ok(matches!(answer.to_ascii_lowercase().as_str(), "y" | "yes"))
    }
}

pub fn heading(title: &str) {
    println!();
    println!("\x1b[1;36m{}\x1b[0m", title);
}

pub fn success(message: &str) {
    println!("\x1b[1;32m✅ {}\x1b[0m", message);
}

pub fn failure(title: &str, message: &str) {
    println!("\x1b[1;31m❌ {}\x1b[0m", title);
    println!("   {}", message);
}

pub fn notice(message: &str) {
    println!("\x1b[33m{}\x1b[0m", message);
}

pub fn dim(message: &str) {
    println!("\x1b[90m{}\x1b[0m", message);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Start {
    Login,
    Register,
}

/// Interactive app loop: login menu, then the dashboard until sign-out
pub async fn run(mut app: App, start: Start) -> Result<()> {
    let mut console = Console::stdin();
    match drive(&mut app, &mut console, start).await {
        Err(e) if e.is::<InputClosed>() => {
            tracing::debug!("Input closed, leaving");
            Ok(())
        }
        other => other,
    }
}

async fn drive<R: AsyncBufRead + Unpin>(app: &mut App, console: &mut Console<R>, start: Start) -> Result<()> {
    if start == Start::Register {
        registration::show(app, console).await?;
    }
    loop {
        match login::show(app, console).await? {
            login::Choice::LoggedIn => dashboard::show(app, console).await?,
            login::Choice::Register => registration::show(app, console).await?,
            login::Choice::Quit => break,
        }
    }
    println!("Goodbye!");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_prompt_trims_and_defaults() {
        let mut console = Console::new(&b"  Ali  \n\nnew\n"[..]);
        assert_eq!(console.prompt("Name").await.unwrap(), "Ali");
        assert_eq!(console.prompt_default("Name", "Ali").await.unwrap(), "Ali");
        assert_eq!(console.prompt_default("Name", "Ali").await.unwrap(), "new");
    }

    #[tokio::test]
    async fn test_end_of_input() {
        let mut console = Console::new(&b"yes\n"[..]);
        assert!(console.confirm("Sure?").await.unwrap());
        let err = console.prompt("Again").await.unwrap_err();
        assert!(err.is::<InputClosed>());
    }

    #[tokio::test]
    async fn test_quit_from_login_menu() {
        let mut app = App::new(crate::config::Config::default()).unwrap();
        let mut console = Console::new(&b"3\n"[..]);
        drive(&mut app, &mut console, Start::Login).await.unwrap();
    }
}
