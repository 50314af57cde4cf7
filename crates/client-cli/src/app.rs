//! Application controller: owns the config, the backend client and the
//! in-memory session, and exposes the actions the screens trigger.

use std::time::Duration;

use chrono::Utc;
use thiserror::Error;

use crate::api::sign_in::{validate_login, ProfileUpdate};
use crate::api::{ApiClient, ApiError, ApiResult};
use crate::config::Config;
use crate::dashboard::{self, DashboardSnapshot};
use crate::device::DeviceIdentity;
use crate::registration::{RegistrationDraft, RegistrationFlow};
use crate::session::{LoginLocation, Session, SessionStore};
use crate::validation::ValidationError;

/// Failure of a user action that validates locally before calling out
#[derive(Debug, Error)]
pub enum ActionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl ActionError {
    /// Copy for a failed login. Server-side rejections read "Login Failed".
    pub fn login_copy(&self) -> (&'static str, String) {
        match self {
            ActionError::Validation(e) => ("Error", e.to_string()),
            ActionError::Api(ApiError::Application { message, .. }) => ("Login Failed", message.clone()),
            ActionError::Api(e) => e.friendly(),
        }
    }
}

pub struct App {
    config: Config,
    client: ApiClient,
    sessions: SessionStore,
}

impl App {
    pub fn new(config: Config) -> ApiResult<Self> {
        let client = ApiClient::new(
            &config.backend.base_url,
            Duration::from_secs(config.backend.timeout_secs),
        )?;
        Ok(Self {
            config,
            client,
            sessions: SessionStore::new(),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Sign in with a fresh device id and store the session
    pub async fn login(&mut self, user_name: &str, password: &str) -> Result<&Session, ActionError> {
        validate_login(user_name, password)?;

        let device = DeviceIdentity::generate(&self.config.device.version);
        let location = &self.config.location;
        let user_info = match self.client.login(user_name, password, location, &device.device_id).await {
            Ok(info) => info,
            Err(e) => {
                tracing::warn!("Login failed [{}]: {}", e.code(), e);
                return Err(e.into());
            }
        };

        let login_location = LoginLocation {
            latitude: location.latitude.clone(),
            longitude: location.longitude.clone(),
            location: location.location.clone(),
            device_id: device.device_id,
            timestamp: Utc::now(),
        };
        self.sessions
            .begin(user_info, login_location)
            .ok_or(ActionError::Api(ApiError::NoSession))
    }

    /// Tell the backend and drop the local session whatever it answers
    pub async fn sign_out(&mut self) -> ApiResult<()> {
        let result = match self.sessions.session() {
            Ok(session) => self.client.sign_out(session).await.map(|_| ()),
            Err(e) => Err(e),
        };
        if let Err(e) = &result {
            tracing::warn!("Sign out failed, clearing the local session anyway: {}", e);
        }
        self.sessions.end();
        result
    }

    pub async fn refresh_dashboard(&self) -> ApiResult<DashboardSnapshot> {
        dashboard::refresh(&self.client, &self.sessions).await
    }

    /// Send a profile change with the device id used at login
    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<(), ActionError> {
        update.validate()?;
        let session = self.sessions.session()?;
        let device_id = self
            .sessions
            .login_data()
            .map(|l| l.location.device_id.clone())
            .unwrap_or_default();
        self.client
            .update_profile(session, &self.sessions.employee_code(), &device_id, update)
            .await?;
        tracing::info!("Profile updated for user {}", session.user_id);
        Ok(())
    }

    pub fn registration(&self, draft: RegistrationDraft) -> RegistrationFlow {
        RegistrationFlow::new(self.client.clone(), &self.config, draft)
    }
}
