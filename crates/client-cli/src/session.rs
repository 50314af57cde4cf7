//! In-memory session and login data, owned by the app controller.
//! Nothing here is written to disk; a restart means a fresh login.

use chrono::{DateTime, Utc};
use shared::LoginResponse;

use crate::api::{ApiError, ApiResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub session_id: String,
    pub user_id: String,
    pub company_id: String,
    pub login_timestamp: DateTime<Utc>,
}

/// Location and device details that were sent with the login call
#[derive(Debug, Clone)]
pub struct LoginLocation {
    pub latitude: String,
    pub longitude: String,
    pub location: String,
    pub device_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct LoginData {
    pub user_info: LoginResponse,
    pub location: LoginLocation,
}

#[derive(Debug, Default)]
pub struct SessionStore {
    session: Option<Session>,
    login: Option<LoginData>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful login. Returns `None` (and stores nothing) when the
    /// response is missing any of the session identifiers.
    pub fn begin(&mut self, user_info: LoginResponse, location: LoginLocation) -> Option<&Session> {
        let (Some(session_id), Some(user_id), Some(company_id)) = (
            non_blank(&user_info.session_id),
            non_blank(&user_info.user_id),
            non_blank(&user_info.company_id),
        ) else {
            tracing::warn!("Login response carried no complete session, not storing it");
            return None;
        };

        let session = Session {
            session_id,
            user_id,
            company_id,
            login_timestamp: location.timestamp,
        };
        tracing::info!("Session started for user {}", session.user_id);

        self.login = Some(LoginData { user_info, location });
        self.session = Some(session);
        self.session.as_ref()
    }

    pub fn session(&self) -> ApiResult<&Session> {
        self.session.as_ref().ok_or(ApiError::NotLoggedIn)
    }

    pub fn login_data(&self) -> Option<&LoginData> {
        self.login.as_ref()
    }

    pub fn is_logged_in(&self) -> bool {
        self.session.is_some()
    }

    /// Employee code from the login profile, empty when unknown
    pub fn employee_code(&self) -> String {
        self.login
            .as_ref()
            .and_then(|l| l.user_info.employee_code.clone())
            .unwrap_or_default()
    }

    pub fn end(&mut self) -> Option<Session> {
        self.login = None;
        let ended = self.session.take();
        if let Some(s) = &ended {
            tracing::info!("Session ended for user {}", s.user_id);
        }
        ended
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|v| !v.trim().is_empty()).cloned()
}
