//! Registration workflow: request, OTP verification, credential completion.
//!
//! `RegistrationFlow` owns the draft, the device identity and the values the
//! server hands back between steps. Each call to [`RegistrationFlow::advance`]
//! performs one remote step and returns the step the flow is now in; a failed
//! step leaves the flow where it was so the user can correct and retry.

use lazy_static::lazy_static;
use regex::Regex;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::api::registration::RegistrationContext;
use crate::api::{ApiClient, ApiError, Attachment};
use crate::config::{Config, LocationConfig};
use crate::device::{DeviceIdentity, DeviceIdentityCache};
use crate::validation::{self, ValidationError};

pub const MIN_USERNAME_LEN: usize = 4;
pub const MIN_PASSWORD_LEN: usize = 6;

// ============================================================================
// Draft and credentials
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Title {
    #[default]
    Mr,
    Mrs,
}

impl Title {
    /// Single-character code the backend stores
    pub fn code(&self) -> &'static str {
        match self {
            Title::Mr => "M",
            Title::Mrs => "F",
        }
    }
}

impl fmt::Display for Title {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Title::Mr => write!(f, "Mr."),
            Title::Mrs => write!(f, "Mrs."),
        }
    }
}

impl FromStr for Title {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().trim_end_matches('.').to_ascii_lowercase().as_str() {
            "mr" => Ok(Title::Mr),
            "mrs" => Ok(Title::Mrs),
            other => Err(format!("Unknown title: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrationDraft {
    pub title: Title,
    pub user_name: String,
    pub staff_id: String,
    pub mobile_no: String,
    pub email: String,
    pub is_company_device: bool,
    pub photo: Option<Attachment>,
}

impl RegistrationDraft {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validation::required(&self.user_name, "your full name")?;
        validation::required(&self.staff_id, "your Staff ID")?;
        validation::required(&self.mobile_no, "your mobile number")?;
        validation::required(&self.email, "your email address")?;
        validation::email(self.email.trim())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    pub confirm_password: String,
}

impl Credentials {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validation::required(&self.username, "a username")?;
        validation::min_len(self.username.trim(), "Username", MIN_USERNAME_LEN)?;
        validation::required(&self.password, "a password")?;
        validation::min_len(&self.password, "Password", MIN_PASSWORD_LEN)?;
        if self.password != self.confirm_password {
            return Err(ValidationError::PasswordMismatch);
        }
        Ok(())
    }
}

// ============================================================================
// Steps
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionOutcome {
    Completed { user_id: String },
    /// No credential endpoint answered; the user should try their Staff ID
    EndpointNotFound { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationStep {
    Draft,
    AwaitingOtp { request_no: String },
    AwaitingCredentials { registration_no: String },
    Finished(CompletionOutcome),
}

impl RegistrationStep {
    fn name(&self) -> &'static str {
        match self {
            RegistrationStep::Draft => "draft",
            RegistrationStep::AwaitingOtp { .. } => "awaiting OTP",
            RegistrationStep::AwaitingCredentials { .. } => "awaiting credentials",
            RegistrationStep::Finished(_) => "finished",
        }
    }
}

#[derive(Debug, Clone)]
pub enum StepInput {
    Request,
    Otp(String),
    Credentials(Credentials),
}

#[derive(Debug, Error)]
pub enum FlowError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Cannot do that while the registration is {step}")]
    InvalidStep { step: &'static str },

    #[error("The server did not return a registration number. Please try again or contact support.")]
    RegistrationNumberMissing,
}

lazy_static! {
    static ref REGISTRATION_NO_REGEX: Regex = Regex::new(r"REG\d+").unwrap();
}

/// First `REG<digits>` token in the server's free-text description
pub fn extract_registration_no(message_desc: &str) -> Option<String> {
    REGISTRATION_NO_REGEX
        .find(message_desc)
        .map(|m| m.as_str().to_string())
}

// ============================================================================
// Flow
// ============================================================================

pub struct RegistrationFlow {
    client: ApiClient,
    company_id: String,
    location: LocationConfig,
    device: DeviceIdentityCache,
    draft: RegistrationDraft,
    step: RegistrationStep,
}

impl RegistrationFlow {
    pub fn new(client: ApiClient, config: &Config, draft: RegistrationDraft) -> Self {
        Self {
            client,
            company_id: config.backend.company_id.clone(),
            location: config.location.clone(),
            device: DeviceIdentityCache::new(config.device.version.clone()),
            draft,
            step: RegistrationStep::Draft,
        }
    }

    pub fn step(&self) -> &RegistrationStep {
        &self.step
    }

    pub fn draft(&self) -> &RegistrationDraft {
        &self.draft
    }

    /// The draft can only be edited before the first request succeeds
    pub fn draft_mut(&mut self) -> Option<&mut RegistrationDraft> {
        match self.step {
            RegistrationStep::Draft => Some(&mut self.draft),
            _ => None,
        }
    }

    pub fn device(&self) -> Option<&DeviceIdentity> {
        self.device.current()
    }

    /// Run the remote call for the current step
    pub async fn advance(&mut self, input: StepInput) -> Result<&RegistrationStep, FlowError> {
        let next = match (self.step.clone(), input) {
            (RegistrationStep::Draft, StepInput::Request) => {
                self.draft.validate()?;
                let request_no = self.request().await?;
                RegistrationStep::AwaitingOtp { request_no }
            }
            (RegistrationStep::AwaitingOtp { request_no }, StepInput::Otp(code)) => {
                validation::otp(&code)?;
                let device = self.device.get_or_generate().clone();
                let ctx = self.context(&device);
                let resp = self
                    .client
                    .registration_submit(&ctx, &self.draft, &code, &request_no)
                    .await?;
                let desc = resp.message_desc.unwrap_or_default();
                let registration_no = extract_registration_no(&desc).ok_or_else(|| {
                    tracing::warn!("No registration number in OTP reply: {}", desc);
                    FlowError::RegistrationNumberMissing
                })?;
                tracing::info!("OTP verified, registration number {}", registration_no);
                RegistrationStep::AwaitingCredentials { registration_no }
            }
            (RegistrationStep::AwaitingCredentials { registration_no }, StepInput::Credentials(credentials)) => {
                credentials.validate()?;
                let device = self.device.get_or_generate().clone();
                let ctx = self.context(&device);
                let outcome = self
                    .client
                    .registration_complete(&ctx, &registration_no, &credentials)
                    .await?;
                RegistrationStep::Finished(outcome)
            }
            (step, _) => return Err(FlowError::InvalidStep { step: step.name() }),
        };

        self.step = next;
        Ok(&self.step)
    }

    /// Resend the OTP by repeating the registration request with the same
    /// device identity. Only legal while waiting for the OTP.
    pub async fn retry(&mut self) -> Result<&RegistrationStep, FlowError> {
        let RegistrationStep::AwaitingOtp { request_no } = &self.step else {
            return Err(FlowError::InvalidStep { step: self.step.name() });
        };
        let previous = request_no.clone();

        let request_no = self.request().await?;
        self.step = RegistrationStep::AwaitingOtp {
            request_no: if request_no.is_empty() { previous } else { request_no },
        };
        Ok(&self.step)
    }

    async fn request(&mut self) -> Result<String, FlowError> {
        let device = self.device.get_or_generate().clone();
        let ctx = self.context(&device);
        let resp = self.client.registration_request(&ctx, &self.draft).await?;
        Ok(resp.request_no.unwrap_or_default())
    }

    fn context<'a>(&'a self, device: &'a DeviceIdentity) -> RegistrationContext<'a> {
        RegistrationContext {
            company_id: &self.company_id,
            location: &self.location,
            device,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use std::time::Duration;

    fn draft() -> RegistrationDraft {
        RegistrationDraft {
            title: Title::Mr,
            user_name: "Ali Hassan".to_string(),
            staff_id: "ST42".to_string(),
            mobile_no: "0501112222".to_string(),
            email: "ali@prime.ae".to_string(),
            is_company_device: false,
            photo: None,
        }
    }

    fn credentials() -> Credentials {
        Credentials {
            username: "alih".to_string(),
            password: "secret1".to_string(),
            confirm_password: "secret1".to_string(),
        }
    }

    fn flow(server: &mockito::Server) -> RegistrationFlow {
        let client = ApiClient::new(&server.url(), Duration::from_secs(5)).unwrap();
        RegistrationFlow::new(client, &Config::default(), draft())
    }

    #[test]
    fn test_title_codes() {
        assert_eq!(Title::Mr.code(), "M");
        assert_eq!(Title::Mrs.code(), "F");
        assert_eq!("Mrs.".parse::<Title>().unwrap(), Title::Mrs);
        assert_eq!("mr".parse::<Title>().unwrap(), Title::Mr);
        assert!("dr".parse::<Title>().is_err());
        assert_eq!(Title::Mrs.to_string(), "Mrs.");
    }

    #[test]
    fn test_draft_validation_order() {
        let mut d = draft();
        d.user_name = " ".to_string();
        d.email = "bad".to_string();
        assert_eq!(d.validate(), Err(ValidationError::Required("your full name")));

        let mut d = draft();
        d.email = "ali@prime".to_string();
        assert_eq!(d.validate(), Err(ValidationError::InvalidEmail));

        assert!(draft().validate().is_ok());
    }

    #[test]
    fn test_credential_rules() {
        assert!(credentials().validate().is_ok());

        let mut c = credentials();
        c.username = "abc".to_string();
        assert_eq!(
            c.validate(),
            Err(ValidationError::TooShort {
                field: "Username",
                min: MIN_USERNAME_LEN
            })
        );

        let mut c = credentials();
        c.password = "12345".to_string();
        c.confirm_password = "12345".to_string();
        assert!(matches!(c.validate(), Err(ValidationError::TooShort { field: "Password", .. })));

        let mut c = credentials();
        c.confirm_password = "secret2".to_string();
        assert_eq!(c.validate(), Err(ValidationError::PasswordMismatch));
    }

    #[test]
    fn test_extract_registration_no() {
        assert_eq!(
            extract_registration_no("Your registration REG2025000000087 is verified"),
            Some("REG2025000000087".to_string())
        );
        assert_eq!(extract_registration_no("Verified"), None);
        assert_eq!(extract_registration_no("REG only"), None);
    }

    #[tokio::test]
    async fn test_out_of_order_input_is_rejected() {
        let server = mockito::Server::new_async().await;
        let mut flow = flow(&server);
        let err = flow.advance(StepInput::Otp("123456".to_string())).await.unwrap_err();
        assert!(matches!(err, FlowError::InvalidStep { step: "draft" }));
        assert!(matches!(flow.retry().await, Err(FlowError::InvalidStep { .. })));
        assert!(flow.device().is_none());
    }

    #[tokio::test]
    async fn test_invalid_draft_makes_no_call() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/RegistrationService/registrationRequest")
            .expect(0)
            .create_async()
            .await;

        let mut flow = flow(&server);
        if let Some(d) = flow.draft_mut() {
            d.email = "nope".to_string();
        }
        let err = flow.advance(StepInput::Request).await.unwrap_err();
        assert!(matches!(err, FlowError::Validation(ValidationError::InvalidEmail)));
        assert_eq!(flow.step(), &RegistrationStep::Draft);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_bad_otp_makes_no_call() {
        let mut server = mockito::Server::new_async().await;
        let _request = server
            .mock("POST", "/RegistrationService/registrationRequest")
            .with_status(200)
            .with_body(r#"{"messageCode":"0","requestNo":"RQ1"}"#)
            .create_async()
            .await;
        let submit = server
            .mock("POST", "/RegistrationService/registrationSubmit")
            .expect(0)
            .create_async()
            .await;

        let mut flow = flow(&server);
        flow.advance(StepInput::Request).await.unwrap();
        for code in ["12345", "12a456", ""] {
            let err = flow.advance(StepInput::Otp(code.to_string())).await.unwrap_err();
            assert!(matches!(err, FlowError::Validation(_)));
        }
        assert!(matches!(flow.step(), RegistrationStep::AwaitingOtp { .. }));
        submit.assert_async().await;
    }

    #[tokio::test]
    async fn test_missing_registration_number_keeps_otp_step() {
        let mut server = mockito::Server::new_async().await;
        let _request = server
            .mock("POST", "/RegistrationService/registrationRequest")
            .with_status(200)
            .with_body(r#"{"messageCode":"0","requestNo":"RQ1"}"#)
            .create_async()
            .await;
        let _submit = server
            .mock("POST", "/RegistrationService/registrationSubmit")
            .with_status(200)
            .with_body(r#"{"messageCode":"0","messageDesc":"Verified"}"#)
            .create_async()
            .await;

        let mut flow = flow(&server);
        flow.advance(StepInput::Request).await.unwrap();
        let err = flow.advance(StepInput::Otp("123456".to_string())).await.unwrap_err();
        assert!(matches!(err, FlowError::RegistrationNumberMissing));
        assert_eq!(
            flow.step(),
            &RegistrationStep::AwaitingOtp {
                request_no: "RQ1".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_same_device_id_across_the_flow() {
        let mut server = mockito::Server::new_async().await;
        let mut flow = flow(&server);

        // The identity is generated lazily, so pin it before building matchers
        let device_id = flow.device.get_or_generate().device_id.clone();
        let carries_id = || Matcher::Regex(format!("name=\"sDeviceID\"\r\n\r\n{}\r\n", regex::escape(&device_id)));

        let request = server
            .mock("POST", "/RegistrationService/registrationRequest")
            .match_body(carries_id())
            .with_status(200)
            .with_body(r#"{"messageCode":"0","requestNo":"RQ9"}"#)
            .expect(2)
            .create_async()
            .await;
        let submit = server
            .mock("POST", "/RegistrationService/registrationSubmit")
            .match_body(Matcher::AllOf(vec![
                carries_id(),
                Matcher::Regex("name=\"sRequestNo\"\r\n\r\nRQ9\r\n".to_string()),
            ]))
            .with_status(200)
            .with_body(r#"{"messageCode":"0","messageDesc":"Registration REG2025000000123 created"}"#)
            .create_async()
            .await;
        let complete = server
            .mock("POST", "/RegistrationService/registrationComplete")
            .match_body(Matcher::AllOf(vec![
                carries_id(),
                Matcher::Regex("name=\"sRegistrationNo\"\r\n\r\nREG2025000000123\r\n".to_string()),
            ]))
            .with_status(200)
            .with_body(r#"{"messageCode":"0","userID":"alih"}"#)
            .create_async()
            .await;

        assert_eq!(
            flow.advance(StepInput::Request).await.unwrap(),
            &RegistrationStep::AwaitingOtp {
                request_no: "RQ9".to_string()
            }
        );
        flow.retry().await.unwrap();
        assert!(flow.draft_mut().is_none());

        assert_eq!(
            flow.advance(StepInput::Otp("654321".to_string())).await.unwrap(),
            &RegistrationStep::AwaitingCredentials {
                registration_no: "REG2025000000123".to_string()
            }
        );
        assert_eq!(
            flow.advance(StepInput::Credentials(credentials())).await.unwrap(),
            &RegistrationStep::Finished(CompletionOutcome::Completed {
                user_id: "alih".to_string()
            })
        );
        assert_eq!(flow.device().map(|d| d.device_id.as_str()), Some(device_id.as_str()));

        request.assert_async().await;
        submit.assert_async().await;
        complete.assert_async().await;
    }
}
