//! RegistrationService: request, OTP submit, credential completion

use shared::{RegistrationCompleteResponse, RegistrationResponse};

use super::{check_code, ApiClient, ApiError, ApiResult, FormFields};
use crate::config::LocationConfig;
use crate::device::DeviceIdentity;
use crate::registration::{CompletionOutcome, Credentials, RegistrationDraft};

const REQUEST: &str = "RegistrationService/registrationRequest";
const SUBMIT: &str = "RegistrationService/registrationSubmit";

/// Credential endpoints tried in order; the backend exposes one of them
pub const COMPLETION_ENDPOINTS: [&str; 4] = [
    "RegistrationService/registrationComplete",
    "RegistrationService/setCredentials",
    "RegistrationService/completeRegistration",
    "UserProfileService/setCredentials",
];

const ENDPOINT_NOT_FOUND_MESSAGE: &str = "Registration verification completed, but the credential setting \
     endpoint is not available. Please contact your administrator to activate your account, \
     or try logging in with your Staff ID.";

/// Values every registration call shares besides the draft itself
#[derive(Debug, Clone, Copy)]
pub struct RegistrationContext<'a> {
    pub company_id: &'a str,
    pub location: &'a LocationConfig,
    pub device: &'a DeviceIdentity,
}

pub(crate) fn draft_form(ctx: &RegistrationContext<'_>, draft: &RegistrationDraft) -> FormFields {
    FormFields::new()
        .text("sCompanyID", ctx.company_id)
        .text("sTitle", draft.title.code())
        .text("sUserName", draft.user_name.clone())
        .text("sStaffID", draft.staff_id.clone())
        .text("sMobileNo", draft.mobile_no.clone())
        .text("sEmail", draft.email.clone())
        .text("sDeviceFlag", if draft.is_company_device { "1" } else { "0" })
        .text("sDeviceInfo", ctx.device.info.clone())
        .text("sDeviceModel", ctx.device.model.clone())
        .text("sDevicePlatForm", ctx.device.platform.clone())
        .text("sDeviceVersion", ctx.device.version.clone())
        .text("sDeviceID", ctx.device.device_id.clone())
        .text("sLatitude", ctx.location.latitude.clone())
        .text("sLongitude", ctx.location.longitude.clone())
        .text("sLocation", ctx.location.location.clone())
        .file("sPhoto", draft.photo.clone())
}

pub(crate) fn completion_form(
    ctx: &RegistrationContext<'_>,
    registration_no: &str,
    credentials: &Credentials,
) -> FormFields {
    FormFields::new()
        .text("sCompanyID", ctx.company_id)
        .text("sRegistrationNo", registration_no)
        .text("sUserID", credentials.username.trim())
        .text("sPassword", credentials.password.clone())
        .text("sDeviceID", ctx.device.device_id.clone())
        .text("sLatitude", ctx.location.latitude.clone())
        .text("sLongitude", ctx.location.longitude.clone())
        .text("sLocation", ctx.location.location.clone())
}

impl ApiClient {
    pub async fn registration_request(
        &self,
        ctx: &RegistrationContext<'_>,
        draft: &RegistrationDraft,
    ) -> ApiResult<RegistrationResponse> {
        tracing::info!(
            "Requesting registration for staff {} on device {}",
            draft.staff_id,
            ctx.device.device_id
        );
        self.call(REQUEST, &draft_form(ctx, draft), "Registration failed. Please try again.")
            .await
    }

    pub async fn registration_submit(
        &self,
        ctx: &RegistrationContext<'_>,
        draft: &RegistrationDraft,
        otp: &str,
        request_no: &str,
    ) -> ApiResult<RegistrationResponse> {
        tracing::info!("Submitting OTP for request {}", request_no);
        let form = draft_form(ctx, draft)
            .text("sInfoOPT", otp)
            .text("sRequestNo", request_no);
        self.call(SUBMIT, &form, "Invalid OTP. Please try again.").await
    }

    /// Probe the credential endpoints in order. The first 2xx reply decides
    /// the outcome; a 2xx body that is not JSON counts as success.
    pub async fn registration_complete(
        &self,
        ctx: &RegistrationContext<'_>,
        registration_no: &str,
        credentials: &Credentials,
    ) -> ApiResult<CompletionOutcome> {
        let form = completion_form(ctx, registration_no, credentials);
        let username = credentials.username.trim().to_string();

        for (i, path) in COMPLETION_ENDPOINTS.iter().enumerate() {
            tracing::debug!("Trying endpoint {}/{}: {}", i + 1, COMPLETION_ENDPOINTS.len(), path);

            let raw = match self.send(path, &form).await {
                Ok(raw) => raw,
                Err(ApiError::Transport(e)) => {
                    tracing::warn!("Endpoint {} unreachable: {}", path, e);
                    continue;
                }
                Err(e) => return Err(e),
            };
            if !raw.status.is_success() {
                tracing::debug!("Endpoint {} answered {}, trying next", path, raw.status);
                continue;
            }

            return match serde_json::from_str::<RegistrationCompleteResponse>(&raw.body) {
                Ok(resp) => {
                    let resp = check_code(resp, "Failed to set credentials. Please try again.")?;
                    tracing::info!("Registration completed via {}", path);
                    Ok(CompletionOutcome::Completed {
                        user_id: resp
                            .user_id
                            .filter(|u| !u.trim().is_empty())
                            .unwrap_or(username),
                    })
                }
                Err(_) => {
                    tracing::info!("Endpoint {} replied without JSON, treating as success", path);
                    Ok(CompletionOutcome::Completed { user_id: username })
                }
            };
        }

        tracing::warn!("No credential endpoint accepted the completion call");
        Ok(CompletionOutcome::EndpointNotFound {
            message: ENDPOINT_NOT_FOUND_MESSAGE.to_string(),
        })
    }
}

/// Code reported for an outcome, matching the backend's vocabulary
pub fn outcome_code(outcome: &CompletionOutcome) -> &'static str {
    match outcome {
        CompletionOutcome::Completed { .. } => shared::SUCCESS_CODE,
        CompletionOutcome::EndpointNotFound { .. } => shared::ENDPOINT_NOT_FOUND,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Attachment;
    use crate::registration::Title;
    use std::time::Duration;

    fn device() -> DeviceIdentity {
        DeviceIdentity {
            device_id: "linux_1735689600000_abcdefghi".to_string(),
            platform: "linux".to_string(),
            version: "6.1".to_string(),
            model: "field-laptop".to_string(),
            info: "linux Device".to_string(),
        }
    }

    fn draft() -> RegistrationDraft {
        RegistrationDraft {
            title: Title::Mrs,
            user_name: "Sara Khan".to_string(),
            staff_id: "ST100".to_string(),
            mobile_no: "0501234567".to_string(),
            email: "sara@prime.ae".to_string(),
            is_company_device: true,
            photo: None,
        }
    }

    fn credentials() -> Credentials {
        Credentials {
            username: "sara".to_string(),
            password: "secret1".to_string(),
            confirm_password: "secret1".to_string(),
        }
    }

    fn client(server: &mockito::Server) -> ApiClient {
        ApiClient::new(&server.url(), Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_draft_form_fields() {
        let location = LocationConfig::default();
        let device = device();
        let ctx = RegistrationContext {
            company_id: "100",
            location: &location,
            device: &device,
        };
        let mut d = draft();
        d.photo = Some(Attachment::image("/tmp/face.png", "photo.jpg"));
        let form = draft_form(&ctx, &d);

        assert_eq!(form.get("sCompanyID"), Some("100"));
        assert_eq!(form.get("sTitle"), Some("F"));
        assert_eq!(form.get("sDeviceFlag"), Some("1"));
        assert_eq!(form.get("sDevicePlatForm"), Some("linux"));
        assert_eq!(form.get("sDeviceID"), Some("linux_1735689600000_abcdefghi"));
        assert_eq!(form.get("sLatitude"), Some("25.2048"));
        assert_eq!(form.attachment().map(|a| a.mime.as_str()), Some("image/png"));
    }

    #[test]
    fn test_completion_form_fields() {
        let location = LocationConfig::default();
        let device = device();
        let ctx = RegistrationContext {
            company_id: "100",
            location: &location,
            device: &device,
        };
        let form = completion_form(&ctx, "REG42", &credentials());
        assert_eq!(
            form.names(),
            vec![
                "sCompanyID",
                "sRegistrationNo",
                "sUserID",
                "sPassword",
                "sDeviceID",
                "sLatitude",
                "sLongitude",
                "sLocation"
            ]
        );
        assert_eq!(form.get("sRegistrationNo"), Some("REG42"));
        assert!(form.redacted().contains("sPassword=[HIDDEN]"));
    }

    async fn complete(server: &mockito::Server) -> ApiResult<CompletionOutcome> {
        let location = LocationConfig::default();
        let device = device();
        let ctx = RegistrationContext {
            company_id: "100",
            location: &location,
            device: &device,
        };
        client(server).registration_complete(&ctx, "REG42", &credentials()).await
    }

    #[tokio::test]
    async fn test_all_endpoints_missing() {
        let mut server = mockito::Server::new_async().await;
        let mut mocks = Vec::new();
        for path in COMPLETION_ENDPOINTS {
            mocks.push(
                server
                    .mock("POST", format!("/{}", path).as_str())
                    .with_status(404)
                    .create_async()
                    .await,
            );
        }

        let outcome = complete(&server).await.unwrap();
        assert!(matches!(outcome, CompletionOutcome::EndpointNotFound { .. }));
        assert_eq!(outcome_code(&outcome), "ENDPOINT_NOT_FOUND");
        for mock in mocks {
            mock.assert_async().await;
        }
    }

    #[tokio::test]
    async fn test_unreachable_backend_ends_in_endpoint_not_found() {
        let location = LocationConfig::default();
        let device = device();
        let ctx = RegistrationContext {
            company_id: "100",
            location: &location,
            device: &device,
        };
        let client = ApiClient::new("http://127.0.0.1:9", Duration::from_secs(1)).unwrap();

        let outcome = client.registration_complete(&ctx, "REG42", &credentials()).await.unwrap();
        assert!(matches!(outcome, CompletionOutcome::EndpointNotFound { .. }));
    }

    #[tokio::test]
    async fn test_mixed_failures_end_in_endpoint_not_found() {
        let mut server = mockito::Server::new_async().await;
        let statuses = [404, 500, 404, 502];
        let mut mocks = Vec::new();
        for (path, status) in COMPLETION_ENDPOINTS.iter().zip(statuses) {
            mocks.push(
                server
                    .mock("POST", format!("/{}", path).as_str())
                    .with_status(status)
                    .with_body("Not here")
                    .create_async()
                    .await,
            );
        }

        let outcome = complete(&server).await.unwrap();
        assert_eq!(outcome_code(&outcome), "ENDPOINT_NOT_FOUND");
        for mock in mocks {
            mock.assert_async().await;
        }
    }

    #[tokio::test]
    async fn test_first_success_stops_probing() {
        let mut server = mockito::Server::new_async().await;
        let first = server
            .mock("POST", "/RegistrationService/registrationComplete")
            .with_status(404)
            .create_async()
            .await;
        let second = server
            .mock("POST", "/RegistrationService/setCredentials")
            .with_status(200)
            .with_body(r#"{"messageCode":"0","userID":"U-55"}"#)
            .create_async()
            .await;
        let third = server
            .mock("POST", "/RegistrationService/completeRegistration")
            .expect(0)
            .create_async()
            .await;

        let outcome = complete(&server).await.unwrap();
        assert_eq!(
            outcome,
            CompletionOutcome::Completed {
                user_id: "U-55".to_string()
            }
        );
        first.assert_async().await;
        second.assert_async().await;
        third.assert_async().await;
    }

    #[tokio::test]
    async fn test_server_error_moves_to_next_candidate() {
        let mut server = mockito::Server::new_async().await;
        let _first = server
            .mock("POST", "/RegistrationService/registrationComplete")
            .with_status(500)
            .create_async()
            .await;
        let _second = server
            .mock("POST", "/RegistrationService/setCredentials")
            .with_status(200)
            .with_body(r#"{"messageCode":"0"}"#)
            .create_async()
            .await;

        let outcome = complete(&server).await.unwrap();
        assert_eq!(
            outcome,
            CompletionOutcome::Completed {
                user_id: "sara".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_non_json_success_is_implicit_success() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/RegistrationService/registrationComplete")
            .with_status(200)
            .with_body("Credentials saved")
            .create_async()
            .await;

        let outcome = complete(&server).await.unwrap();
        assert_eq!(
            outcome,
            CompletionOutcome::Completed {
                user_id: "sara".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_application_failure_is_reported() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/RegistrationService/registrationComplete")
            .with_status(200)
            .with_body(r#"{"messageCode":"4","messageText":"Username taken"}"#)
            .create_async()
            .await;

        let err = complete(&server).await.unwrap_err();
        assert_eq!(err.code(), "4");
        assert_eq!(err.to_string(), "Username taken");
    }

    #[tokio::test]
    async fn test_submit_appends_otp_and_request_no() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/RegistrationService/registrationSubmit")
            .match_body(mockito::Matcher::AllOf(vec![
                mockito::Matcher::Regex("name=\"sInfoOPT\"\r\n\r\n123456\r\n".to_string()),
                mockito::Matcher::Regex("name=\"sRequestNo\"\r\n\r\nRQ7\r\n".to_string()),
            ]))
            .with_status(200)
            .with_body(r#"{"messageCode":"0","messageDesc":"Registered as REG1001"}"#)
            .create_async()
            .await;

        let location = LocationConfig::default();
        let device = device();
        let ctx = RegistrationContext {
            company_id: "100",
            location: &location,
            device: &device,
        };
        let resp = client(&server)
            .registration_submit(&ctx, &draft(), "123456", "RQ7")
            .await
            .unwrap();
        assert_eq!(resp.message_desc.as_deref(), Some("Registered as REG1001"));
        mock.assert_async().await;
    }
}
