//! SignInService: login, sign-out, attendance, profile

use shared::{AttendanceResponse, BasicResponse, Coded, LoginResponse};

use super::{session_form, ApiClient, ApiError, ApiResult, Attachment, FormFields};
use crate::config::LocationConfig;
use crate::session::Session;
use crate::validation::{self, ValidationError};

const SIGN_IN: &str = "SignInService/signInProcess";
const SIGN_OUT: &str = "SignInService/signOutProcess";
const ATTENDANCE: &str = "SignInService/attendanceTime";
const PROFILE_UPDATE: &str = "SignInService/profileUpdate";
const USER_IMAGE: &str = "SignInService/userImage";

/// Check the login form before calling the backend
pub fn validate_login(user_name: &str, password: &str) -> Result<(), ValidationError> {
    validation::required(user_name, "both Staff ID/Email and Password")?;
    validation::required(password, "both Staff ID/Email and Password")?;
    Ok(())
}

/// Editable profile fields from the dashboard
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub name: String,
    pub mobile: String,
    pub email: String,
    /// Empty keeps the current password
    pub password: String,
    pub photo: Option<Attachment>,
}

impl ProfileUpdate {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut missing = Vec::new();
        if self.name.trim().is_empty() {
            missing.push("Name");
        }
        if self.mobile.trim().is_empty() {
            missing.push("Mobile");
        }
        if self.email.trim().is_empty() {
            missing.push("Email");
        }
        if !missing.is_empty() {
            return Err(ValidationError::MissingFields(missing));
        }
        Ok(())
    }
}

pub(crate) fn login_form(user_name: &str, password: &str, location: &LocationConfig, device_id: &str) -> FormFields {
    FormFields::new()
        .text("sUserID", user_name.trim())
        .text("sPassword", password.trim())
        .text("sLatitude", location.latitude.clone())
        .text("sLongitude", location.longitude.clone())
        .text("sLocation", location.location.clone())
        .text("sDeviceID", device_id)
}

impl ApiClient {
    pub async fn login(
        &self,
        user_name: &str,
        password: &str,
        location: &LocationConfig,
        device_id: &str,
    ) -> ApiResult<LoginResponse> {
        tracing::info!("Signing in as {}", user_name.trim());
        let form = login_form(user_name, password, location, device_id);
        self.call(SIGN_IN, &form, "Invalid credentials or server error.").await
    }

    pub async fn sign_out(&self, session: &Session) -> ApiResult<BasicResponse> {
        tracing::info!("Signing out user {}", session.user_id);
        self.call(SIGN_OUT, &session_form(session), "Sign out failed").await
    }

    pub async fn attendance(&self, session: &Session, employee_code: &str) -> ApiResult<AttendanceResponse> {
        let form = session_form(session).text("sEmployeeCode", employee_code);
        self.call(ATTENDANCE, &form, "Attendance data unavailable").await
    }

    pub async fn update_profile(
        &self,
        session: &Session,
        employee_code: &str,
        device_id: &str,
        update: &ProfileUpdate,
    ) -> ApiResult<BasicResponse> {
        let form = session_form(session)
            .text("sEmployeeCode", employee_code)
            .text("sPassword", update.password.clone())
            .text("sMobileNo", update.mobile.clone())
            .text("sEmail", update.email.clone())
            .text("sDeviceID", device_id)
            .file("sPhoto", update.photo.clone());

        let raw = self.send(PROFILE_UPDATE, &form).await?.error_for_status()?;
        let resp: BasicResponse = raw.json()?;
        if resp.is_success() {
            return Ok(resp);
        }
        // This endpoint explains failures in messageDesc
        Err(ApiError::Application {
            code: resp.message_code.clone(),
            message: resp
                .message_desc
                .clone()
                .filter(|d| !d.trim().is_empty())
                .unwrap_or_else(|| "Failed to update profile".to_string()),
        })
    }

    /// URL of the signed-in user's photo
    pub fn user_image_url(&self, session: &Session) -> ApiResult<reqwest::Url> {
        reqwest::Url::parse_with_params(
            &self.endpoint(USER_IMAGE),
            &[
                ("sUserID", session.user_id.as_str()),
                ("sSessionID", session.session_id.as_str()),
                ("sCompanyID", session.company_id.as_str()),
            ],
        )
        .map_err(|e| ApiError::InvalidUrl(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use mockito::Matcher;
    use std::time::Duration;

    fn client(server: &mockito::Server) -> ApiClient {
        ApiClient::new(&server.url(), Duration::from_secs(5)).unwrap()
    }

    fn session() -> Session {
        Session {
            session_id: "S1".to_string(),
            user_id: "U1".to_string(),
            company_id: "100".to_string(),
            login_timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_login_form_vocabulary() {
        let form = login_form("  ali  ", " pw ", &LocationConfig::default(), "linux_1_abc");
        assert_eq!(
            form.names(),
            vec!["sUserID", "sPassword", "sLatitude", "sLongitude", "sLocation", "sDeviceID"]
        );
        assert_eq!(form.get("sUserID"), Some("ali"));
        assert_eq!(form.get("sPassword"), Some("pw"));
        assert_eq!(form.get("sLocation"), Some("Dubai, UAE"));
    }

    #[test]
    fn test_validate_login() {
        assert!(validate_login("ali", "pw").is_ok());
        assert!(validate_login(" ", "pw").is_err());
        assert!(validate_login("ali", "").is_err());
    }

    #[test]
    fn test_profile_validation_lists_missing_fields() {
        let update = ProfileUpdate {
            name: "Ali".to_string(),
            ..Default::default()
        };
        assert_eq!(
            update.validate(),
            Err(ValidationError::MissingFields(vec!["Mobile", "Email"]))
        );
    }

    #[test]
    fn test_user_image_url_encodes_identifiers() {
        let c = ApiClient::new("http://host/webapi", Duration::from_secs(1)).unwrap();
        let mut s = session();
        s.session_id = "a b&c".to_string();
        let url = c.user_image_url(&s).unwrap();
        assert_eq!(url.path(), "/webapi/SignInService/userImage");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs[1], ("sSessionID".to_string(), "a b&c".to_string()));
    }

    #[tokio::test]
    async fn test_login_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/SignInService/signInProcess")
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex("name=\"sUserID\"\r\n\r\nali\r\n".to_string()),
                Matcher::Regex("linux_1_abc".to_string()),
            ]))
            .with_status(200)
            .with_body(r#"{"messageCode":"0","sessionID":"S1","userID":"U1","companyID":"100","userName":"Ali"}"#)
            .create_async()
            .await;

        let resp = client(&server)
            .login("ali", "pw", &LocationConfig::default(), "linux_1_abc")
            .await
            .unwrap();
        assert_eq!(resp.session_id.as_deref(), Some("S1"));
        assert_eq!(resp.user_name.as_deref(), Some("Ali"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_login_rejected() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/SignInService/signInProcess")
            .with_status(200)
            .with_body(r#"{"messageCode":"1"}"#)
            .create_async()
            .await;

        let err = client(&server)
            .login("ali", "bad", &LocationConfig::default(), "d")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid credentials or server error.");
    }

    #[tokio::test]
    async fn test_sign_out_sends_session_fields() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/SignInService/signOutProcess")
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex("name=\"sSessionID\"\r\n\r\nS1\r\n".to_string()),
                Matcher::Regex("name=\"sCompanyID\"\r\n\r\n100\r\n".to_string()),
            ]))
            .with_status(200)
            .with_body(r#"{"messageCode":"0"}"#)
            .create_async()
            .await;

        client(&server).sign_out(&session()).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_profile_update_failure_uses_desc() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/SignInService/profileUpdate")
            .with_status(200)
            .with_body(r#"{"messageCode":"2","messageText":"x","messageDesc":"Email already used"}"#)
            .create_async()
            .await;

        let update = ProfileUpdate {
            name: "Ali".to_string(),
            mobile: "0500000000".to_string(),
            email: "ali@prime.ae".to_string(),
            ..Default::default()
        };
        let err = client(&server)
            .update_profile(&session(), "E1", "d", &update)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Email already used");
    }
}
