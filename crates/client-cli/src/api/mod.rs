//! Remote call adapters for the field-service backend.
//!
//! Every backend call is a `multipart/form-data` POST whose reply is a JSON
//! object carrying a `messageCode`. The outcome of a call is classified once,
//! here, into transport / HTTP / empty / parse / application failures; the
//! per-service modules only build forms and pick response types.

pub mod enquiry;
pub mod registration;
pub mod sign_in;

use reqwest::{multipart, Client, StatusCode};
use serde::de::DeserializeOwned;
use shared::Coded;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::session::Session;

pub type ApiResult<T> = std::result::Result<T, ApiError>;

const LOG_BODY_PREFIX: usize = 200;

#[derive(Debug, Error)]
pub enum ApiError {
    /// No connectivity, DNS failure, timeout
    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    /// `body` holds the start of the server's reply, if it sent one
    #[error("HTTP {status}")]
    Http { status: StatusCode, body: Option<String> },

    #[error("The server returned an empty response")]
    EmptyResponse,

    #[error("Invalid JSON response from server: {0}")]
    Parse(#[from] serde_json::Error),

    /// `messageCode` other than `"0"`
    #[error("{message}")]
    Application { code: String, message: String },

    #[error("No active session, please login first")]
    NotLoggedIn,

    /// Login reported success without session identifiers
    #[error("The server accepted the login but returned no session")]
    NoSession,

    #[error("Could not read attachment {}: {source}", path.display())]
    Attachment {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid endpoint URL: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    /// Legacy code string for this failure, or the server's own `messageCode`
    pub fn code(&self) -> &str {
        match self {
            ApiError::Transport(_) => "NETWORK_ERROR",
            ApiError::Http { .. } => "HTTP_ERROR",
            ApiError::EmptyResponse => "EMPTY_RESPONSE",
            ApiError::Parse(_) => "PARSE_ERROR",
            ApiError::Application { code, .. } => code,
            ApiError::NotLoggedIn | ApiError::NoSession | ApiError::Attachment { .. } | ApiError::InvalidUrl(_) => {
                "ERROR"
            }
        }
    }

    /// Title and message suitable for showing to the user
    pub fn friendly(&self) -> (&'static str, String) {
        match self {
            ApiError::Transport(_) => (
                "Connection Error",
                "Could not connect to the server. Please check your internet connection and try again."
                    .to_string(),
            ),
            ApiError::Http { status, body: Some(text) } => (
                "Server Error",
                format!("The server encountered an error (HTTP {}): {}", status.as_u16(), text),
            ),
            ApiError::Http { status, body: None } => (
                "Server Error",
                format!("The server encountered an error (HTTP {}). Please try again later.", status.as_u16()),
            ),
            ApiError::EmptyResponse => (
                "Server Issue",
                "The server returned an empty response. This usually means invalid credentials, \
                 server maintenance or a connectivity issue. Please check your details and try again."
                    .to_string(),
            ),
            ApiError::Parse(_) => (
                "Server Error",
                "The server response could not be processed. Please try again or contact support \
                 if the issue persists."
                    .to_string(),
            ),
            ApiError::Application { message, .. } => ("Request Failed", message.clone()),
            ApiError::NotLoggedIn => ("Not Logged In", self.to_string()),
            ApiError::NoSession => ("Login Failed", self.to_string()),
            ApiError::Attachment { .. } | ApiError::InvalidUrl(_) => ("Error", self.to_string()),
        }
    }
}

// ============================================================================
// Multipart forms
// ============================================================================

/// A file part, e.g. a profile photo
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub path: PathBuf,
    pub mime: String,
    pub file_name: String,
}

impl Attachment {
    /// Attachment for a local image; type defaults to JPEG and the file name
    /// to `default_name` when the path has none.
    pub fn image(path: impl Into<PathBuf>, default_name: &str) -> Self {
        let path = path.into();
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(String::from)
            .unwrap_or_else(|| default_name.to_string());
        let mime = match path.extension().and_then(|e| e.to_str()).map(|e| e.to_ascii_lowercase()) {
            Some(ext) if ext == "png" => "image/png",
            Some(ext) if ext == "heic" => "image/heic",
            _ => "image/jpeg",
        };
        Self {
            path,
            mime: mime.to_string(),
            file_name,
        }
    }
}

/// Ordered form fields with the backend's fixed field names. Kept separate
/// from `reqwest::multipart::Form` so a form can be logged and re-sent.
#[derive(Debug, Clone, Default)]
pub struct FormFields {
    fields: Vec<(&'static str, String)>,
    file: Option<(&'static str, Attachment)>,
}

impl FormFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.fields.push((name, value.into()));
        self
    }

    pub fn file(mut self, name: &'static str, attachment: Option<Attachment>) -> Self {
        self.file = attachment.map(|a| (name, a));
        self
    }

    #[cfg(test)]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
    }

    #[cfg(test)]
    pub fn names(&self) -> Vec<&'static str> {
        self.fields.iter().map(|(n, _)| *n).collect()
    }

    #[cfg(test)]
    pub fn attachment(&self) -> Option<&Attachment> {
        self.file.as_ref().map(|(_, a)| a)
    }

    /// `name=value` pairs for logs, with the password hidden
    pub fn redacted(&self) -> String {
        let mut parts: Vec<String> = self
            .fields
            .iter()
            .map(|(name, value)| {
                if *name == "sPassword" {
                    format!("{}=[HIDDEN]", name)
                } else {
                    format!("{}={}", name, value)
                }
            })
            .collect();
        if let Some((name, file)) = &self.file {
            parts.push(format!("{}=<{} {}>", name, file.mime, file.file_name));
        }
        parts.join(", ")
    }

    async fn to_multipart(&self) -> ApiResult<multipart::Form> {
        let mut form = multipart::Form::new();
        for (name, value) in &self.fields {
            form = form.text(*name, value.clone());
        }
        if let Some((name, file)) = &self.file {
            let bytes = tokio::fs::read(&file.path)
                .await
                .map_err(|source| ApiError::Attachment {
                    path: file.path.clone(),
                    source,
                })?;
            let part = multipart::Part::bytes(bytes)
                .file_name(file.file_name.clone())
                .mime_str(&file.mime)?;
            form = form.part(*name, part);
        }
        Ok(form)
    }
}

/// `sUserID`, `sSessionID`, `sCompanyID`: the identifiers every
/// authenticated call embeds in place of auth headers
pub fn session_form(session: &Session) -> FormFields {
    FormFields::new()
        .text("sUserID", session.user_id.clone())
        .text("sSessionID", session.session_id.clone())
        .text("sCompanyID", session.company_id.clone())
}

// ============================================================================
// Client
// ============================================================================

#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

/// Status and body of a reply before any interpretation
#[derive(Debug)]
pub(crate) struct RawResponse {
    pub status: StatusCode,
    pub body: String,
}

impl RawResponse {
    pub fn error_for_status(self) -> ApiResult<Self> {
        if !self.status.is_success() {
            let text = self.body.trim();
            let body = (!text.is_empty()).then(|| text.chars().take(LOG_BODY_PREFIX).collect());
            return Err(ApiError::Http { status: self.status, body });
        }
        Ok(self)
    }

    pub fn json<T: DeserializeOwned>(&self) -> ApiResult<T> {
        if self.body.trim().is_empty() {
            return Err(ApiError::EmptyResponse);
        }
        Ok(serde_json::from_str(&self.body)?)
    }
}

/// Turn a non-`"0"` `messageCode` into an application error
pub(crate) fn check_code<T: Coded>(resp: T, fallback: &str) -> ApiResult<T> {
    if resp.is_success() {
        return Ok(resp);
    }
    Err(ApiError::Application {
        code: resp.message_code().to_string(),
        message: resp.failure_text().unwrap_or(fallback).to_string(),
    })
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> ApiResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Absolute URL for a `Service/operation` path
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// POST the form; only transport failures are errors at this level
    pub(crate) async fn send(&self, path: &str, form: &FormFields) -> ApiResult<RawResponse> {
        let url = self.endpoint(path);
        tracing::debug!("POST {} [{}]", url, form.redacted());

        let resp = self
            .client
            .post(&url)
            .header(reqwest::header::ACCEPT, "application/json")
            .multipart(form.to_multipart().await?)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!("Network error calling {}: {}", url, e);
                ApiError::Transport(e)
            })?;

        let status = resp.status();
        let body = resp.text().await?;
        tracing::debug!(
            "{} -> {} {}",
            path,
            status,
            body.chars().take(LOG_BODY_PREFIX).collect::<String>()
        );

        Ok(RawResponse { status, body })
    }

    /// Full classification: transport, HTTP status, empty body, JSON, `messageCode`
    pub(crate) async fn call<T>(&self, path: &str, form: &FormFields, fallback: &str) -> ApiResult<T>
    where
        T: DeserializeOwned + Coded,
    {
        let raw = self.send(path, form).await?.error_for_status()?;
        let resp: T = raw.json()?;
        check_code(resp, fallback)
    }

    /// For the few endpoints that reply with a bare JSON value and no `messageCode`
    pub(crate) async fn call_uncoded<T: DeserializeOwned>(&self, path: &str, form: &FormFields) -> ApiResult<T> {
        let raw = self.send(path, form).await?.error_for_status()?;
        raw.json()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::BasicResponse;

    fn client(server: &mockito::Server) -> ApiClient {
        ApiClient::new(&server.url(), Duration::from_secs(5)).unwrap()
    }

    fn form() -> FormFields {
        FormFields::new().text("sUserID", "ali").text("sPassword", "secret")
    }

    #[test]
    fn test_redacted_hides_password() {
        let form = form().file("sPhoto", Some(Attachment::image("/tmp/me.png", "photo.jpg")));
        let text = form.redacted();
        assert!(text.contains("sUserID=ali"));
        assert!(text.contains("sPassword=[HIDDEN]"));
        assert!(!text.contains("secret"));
        assert!(text.contains("sPhoto=<image/png me.png>"));
    }

    #[test]
    fn test_attachment_defaults() {
        let a = Attachment::image("/", "photo.jpg");
        assert_eq!(a.file_name, "photo.jpg");
        assert_eq!(a.mime, "image/jpeg");
    }

    #[test]
    fn test_endpoint_joins_paths() {
        let c = ApiClient::new("http://host/webapi/", Duration::from_secs(1)).unwrap();
        assert_eq!(c.endpoint("/SignInService/signInProcess"), "http://host/webapi/SignInService/signInProcess");
        assert_eq!(c.endpoint("SignInService/x"), "http://host/webapi/SignInService/x");
    }

    #[tokio::test]
    async fn test_success_code() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/Svc/op")
            .match_body(mockito::Matcher::Regex("name=\"sUserID\"".to_string()))
            .with_status(200)
            .with_body(r#"{"messageCode":"0","messageText":"ok"}"#)
            .create_async()
            .await;

        let resp: BasicResponse = client(&server).call("Svc/op", &form(), "failed").await.unwrap();
        assert_eq!(resp.message_text.as_deref(), Some("ok"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_http_status_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server.mock("POST", "/Svc/op").with_status(500).create_async().await;

        let err = client(&server).call::<BasicResponse>("Svc/op", &form(), "failed").await.unwrap_err();
        assert!(matches!(err, ApiError::Http { status, body: None } if status == StatusCode::INTERNAL_SERVER_ERROR));
        assert_eq!(err.code(), "HTTP_ERROR");
        assert!(err.friendly().1.contains("HTTP 500). Please try again later."));
    }

    #[tokio::test]
    async fn test_http_error_shows_server_text() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/Svc/op")
            .with_status(503)
            .with_body("  Service is under maintenance  ")
            .create_async()
            .await;

        let err = client(&server).call::<BasicResponse>("Svc/op", &form(), "failed").await.unwrap_err();
        assert!(matches!(&err, ApiError::Http { body: Some(b), .. } if b == "Service is under maintenance"));
        let (title, message) = err.friendly();
        assert_eq!(title, "Server Error");
        assert_eq!(message, "The server encountered an error (HTTP 503): Service is under maintenance");
    }

    #[tokio::test]
    async fn test_empty_body_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server.mock("POST", "/Svc/op").with_status(200).with_body("  ").create_async().await;

        let err = client(&server).call::<BasicResponse>("Svc/op", &form(), "failed").await.unwrap_err();
        assert!(matches!(err, ApiError::EmptyResponse));
        assert_eq!(err.code(), "EMPTY_RESPONSE");
    }

    #[tokio::test]
    async fn test_parse_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server.mock("POST", "/Svc/op").with_status(200).with_body("<html>").create_async().await;

        let err = client(&server).call::<BasicResponse>("Svc/op", &form(), "failed").await.unwrap_err();
        assert!(matches!(err, ApiError::Parse(_)));
        assert_eq!(err.code(), "PARSE_ERROR");
    }

    #[tokio::test]
    async fn test_application_error_carries_server_text() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/Svc/op")
            .with_status(200)
            .with_body(r#"{"messageCode":"3","messageDesc":"Invalid user"}"#)
            .create_async()
            .await;

        let err = client(&server).call::<BasicResponse>("Svc/op", &form(), "failed").await.unwrap_err();
        match &err {
            ApiError::Application { code, message } => {
                assert_eq!(code, "3");
                assert_eq!(message, "Invalid user");
            }
            other => panic!("Expected application error, got {:?}", other),
        }
        assert_eq!(err.friendly().1, "Invalid user");
    }

    #[tokio::test]
    async fn test_application_error_fallback_text() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/Svc/op")
            .with_status(200)
            .with_body(r#"{"messageCode":"9"}"#)
            .create_async()
            .await;

        let err = client(&server).call::<BasicResponse>("Svc/op", &form(), "failed").await.unwrap_err();
        assert_eq!(err.to_string(), "failed");
    }

    #[tokio::test]
    async fn test_transport_error() {
        // Nothing listens on port 9 of the loopback interface
        let c = ApiClient::new("http://127.0.0.1:9", Duration::from_secs(2)).unwrap();
        let err = c.call::<BasicResponse>("Svc/op", &form(), "failed").await.unwrap_err();
        assert!(matches!(err, ApiError::Transport(_)));
        assert_eq!(err.code(), "NETWORK_ERROR");
        assert_eq!(err.friendly().0, "Connection Error");
    }

    #[tokio::test]
    async fn test_missing_attachment_fails_before_sending() {
        let mut server = mockito::Server::new_async().await;
        let mock = server.mock("POST", "/Svc/op").expect(0).create_async().await;

        let form = form().file("sPhoto", Some(Attachment::image("/nonexistent/me.jpg", "photo.jpg")));
        let err = client(&server).call::<BasicResponse>("Svc/op", &form, "failed").await.unwrap_err();
        assert!(matches!(err, ApiError::Attachment { .. }));
        mock.assert_async().await;
    }
}
