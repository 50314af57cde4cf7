use serde::{Deserialize, Serialize};

/// `messageCode` value the backend uses for application-level success
pub const SUCCESS_CODE: &str = "0";

/// Code reported when no credential endpoint accepted a registration completion
pub const ENDPOINT_NOT_FOUND: &str = "ENDPOINT_NOT_FOUND";

// ============================================================================
// Coded responses
// ============================================================================

/// Every JSON object the backend returns embeds a `messageCode` and, on
/// failure, some human-readable text in `messageText` or `messageDesc`.
pub trait Coded {
    fn message_code(&self) -> &str;
    fn message_text(&self) -> Option<&str>;
    fn message_desc(&self) -> Option<&str>;

    fn is_success(&self) -> bool {
        self.message_code() == SUCCESS_CODE
    }

    /// Server text for a failed call, preferring `messageText` over `messageDesc`
    fn failure_text(&self) -> Option<&str> {
        self.message_text()
            .filter(|t| !t.trim().is_empty())
            .or_else(|| self.message_desc().filter(|t| !t.trim().is_empty()))
    }
}

macro_rules! impl_coded {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Coded for $ty {
                fn message_code(&self) -> &str {
                    &self.message_code
                }

                fn message_text(&self) -> Option<&str> {
                    self.message_text.as_deref()
                }

                fn message_desc(&self) -> Option<&str> {
                    self.message_desc.as_deref()
                }
            }
        )*
    };
}

impl_coded!(
    BasicResponse,
    LoginResponse,
    RegistrationResponse,
    RegistrationCompleteResponse,
    AttendanceResponse,
    TrackingResponse,
    TerritoryHistoryResponse,
    NotificationEnquiryResponse,
);

// ============================================================================
// SignInService
// ============================================================================

/// Response shape shared by calls that only report a status (sign-out, profile update)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BasicResponse {
    #[serde(rename = "messageCode", default, deserialize_with = "lenient::string")]
    pub message_code: String,
    #[serde(rename = "messageText", default, deserialize_with = "lenient::opt_string")]
    pub message_text: Option<String>,
    #[serde(rename = "messageDesc", default, deserialize_with = "lenient::opt_string")]
    pub message_desc: Option<String>,
}

/// `signInProcess` response: the staff profile plus the session identifiers
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginResponse {
    #[serde(rename = "messageCode", default, deserialize_with = "lenient::string")]
    pub message_code: String,
    #[serde(rename = "messageText", default, deserialize_with = "lenient::opt_string")]
    pub message_text: Option<String>,
    #[serde(rename = "messageDesc", default, deserialize_with = "lenient::opt_string")]
    pub message_desc: Option<String>,
    #[serde(rename = "companyID", default, deserialize_with = "lenient::opt_string")]
    pub company_id: Option<String>,
    #[serde(rename = "companyName", default, deserialize_with = "lenient::opt_string")]
    pub company_name: Option<String>,
    #[serde(rename = "sessionID", default, deserialize_with = "lenient::opt_string")]
    pub session_id: Option<String>,
    #[serde(rename = "userID", default, deserialize_with = "lenient::opt_string")]
    pub user_id: Option<String>,
    #[serde(rename = "userName", default, deserialize_with = "lenient::opt_string")]
    pub user_name: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub department: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub designation: Option<String>,
    #[serde(rename = "emailAddress", default, deserialize_with = "lenient::opt_string")]
    pub email_address: Option<String>,
    #[serde(rename = "employeeCode", default, deserialize_with = "lenient::opt_string")]
    pub employee_code: Option<String>,
    #[serde(rename = "mobileNo", default, deserialize_with = "lenient::opt_string")]
    pub mobile_no: Option<String>,
    #[serde(rename = "staffID", default, deserialize_with = "lenient::opt_string")]
    pub staff_id: Option<String>,
    #[serde(rename = "timeDuration", default, deserialize_with = "lenient::opt_string")]
    pub time_duration: Option<String>,
    #[serde(rename = "todayCheckIn", default, deserialize_with = "lenient::opt_string")]
    pub today_check_in: Option<String>,
}

/// `attendanceTime` response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AttendanceResponse {
    #[serde(rename = "messageCode", default, deserialize_with = "lenient::string")]
    pub message_code: String,
    #[serde(rename = "messageText", default, deserialize_with = "lenient::opt_string")]
    pub message_text: Option<String>,
    #[serde(rename = "messageDesc", default, deserialize_with = "lenient::opt_string")]
    pub message_desc: Option<String>,
    #[serde(rename = "todayCheckIn", default, deserialize_with = "lenient::opt_string")]
    pub today_check_in: Option<String>,
    #[serde(rename = "workingHours", default, deserialize_with = "lenient::opt_string")]
    pub working_hours: Option<String>,
    #[serde(rename = "attendanceStatus", default, deserialize_with = "lenient::opt_string")]
    pub attendance_status: Option<String>,
}

// ============================================================================
// RegistrationService
// ============================================================================

/// `registrationRequest` / `registrationSubmit` response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistrationResponse {
    #[serde(rename = "messageCode", default, deserialize_with = "lenient::string")]
    pub message_code: String,
    #[serde(rename = "messageText", default, deserialize_with = "lenient::opt_string")]
    pub message_text: Option<String>,
    #[serde(rename = "messageDesc", default, deserialize_with = "lenient::opt_string")]
    pub message_desc: Option<String>,
    #[serde(rename = "requestNo", default, deserialize_with = "lenient::opt_string")]
    pub request_no: Option<String>,
    #[serde(rename = "userID", default, deserialize_with = "lenient::opt_string")]
    pub user_id: Option<String>,
    #[serde(rename = "sessionID", default, deserialize_with = "lenient::opt_string")]
    pub session_id: Option<String>,
    #[serde(rename = "companyID", default, deserialize_with = "lenient::opt_string")]
    pub company_id: Option<String>,
}

/// Response from whichever credential endpoint accepted the completion call
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistrationCompleteResponse {
    #[serde(rename = "messageCode", default, deserialize_with = "lenient::string")]
    pub message_code: String,
    #[serde(rename = "messageText", default, deserialize_with = "lenient::opt_string")]
    pub message_text: Option<String>,
    #[serde(rename = "messageDesc", default, deserialize_with = "lenient::opt_string")]
    pub message_desc: Option<String>,
    #[serde(rename = "userID", default, deserialize_with = "lenient::opt_string")]
    pub user_id: Option<String>,
    #[serde(rename = "sessionID", default, deserialize_with = "lenient::opt_string")]
    pub session_id: Option<String>,
}

// ============================================================================
// Notifications and enquiries
// ============================================================================

/// One push notification. `pushNotificationData` returns a bare array of these.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Notification {
    #[serde(rename = "messageTitle", default, deserialize_with = "lenient::string")]
    pub message_title: String,
    #[serde(rename = "messageDetails", default, deserialize_with = "lenient::string")]
    pub message_details: String,
    #[serde(rename = "messageDate", default, deserialize_with = "lenient::string")]
    pub message_date: String,
    #[serde(rename = "referenceNo", default, deserialize_with = "lenient::string")]
    pub reference_no: String,
    #[serde(rename = "isRead", default, deserialize_with = "lenient::flag")]
    pub is_read: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TrackingEntry {
    #[serde(default, deserialize_with = "lenient::string")]
    pub timestamp: String,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub location: Option<String>,
}

/// `liveTracking` response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrackingResponse {
    #[serde(rename = "messageCode", default, deserialize_with = "lenient::string")]
    pub message_code: String,
    #[serde(rename = "messageText", default, deserialize_with = "lenient::opt_string")]
    pub message_text: Option<String>,
    #[serde(rename = "messageDesc", default, deserialize_with = "lenient::opt_string")]
    pub message_desc: Option<String>,
    #[serde(rename = "trackingList", default)]
    pub tracking_list: Vec<TrackingEntry>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TerritoryVisit {
    #[serde(rename = "visitDate", default, deserialize_with = "lenient::string")]
    pub visit_date: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub territory: String,
}

/// `territoryHistory` response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TerritoryHistoryResponse {
    #[serde(rename = "messageCode", default, deserialize_with = "lenient::string")]
    pub message_code: String,
    #[serde(rename = "messageText", default, deserialize_with = "lenient::opt_string")]
    pub message_text: Option<String>,
    #[serde(rename = "messageDesc", default, deserialize_with = "lenient::opt_string")]
    pub message_desc: Option<String>,
    #[serde(rename = "territoryList", default)]
    pub territory_list: Vec<TerritoryVisit>,
}

/// `pushNotificationEnquiry` response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationEnquiryResponse {
    #[serde(rename = "messageCode", default, deserialize_with = "lenient::string")]
    pub message_code: String,
    #[serde(rename = "messageText", default, deserialize_with = "lenient::opt_string")]
    pub message_text: Option<String>,
    #[serde(rename = "messageDesc", default, deserialize_with = "lenient::opt_string")]
    pub message_desc: Option<String>,
    #[serde(rename = "notificationList", default)]
    pub notification_list: Vec<Notification>,
}

// ============================================================================
// Lenient field decoding
// The backend is inconsistent about scalar types: codes and ids arrive as
// strings or numbers, flags as booleans, numbers or "Y"/"true".
// ============================================================================

mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    fn scalar_to_string(value: Value) -> Option<String> {
        match value {
            Value::Null => None,
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            other => Some(other.to_string()),
        }
    }

    pub fn string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        Ok(scalar_to_string(Value::deserialize(d)?).unwrap_or_default())
    }

    pub fn opt_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        Ok(scalar_to_string(Value::deserialize(d)?))
    }

    pub fn flag<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::Bool(b) => b,
            Value::Number(n) => n.as_i64().map(|n| n != 0).unwrap_or(false),
            Value::String(s) => matches!(
                s.trim().to_ascii_lowercase().as_str(),
                "true" | "1" | "y" | "yes"
            ),
            _ => false,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
