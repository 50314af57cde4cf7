//! Dashboard data: profile, photo, notifications and attendance, fetched
//! together, plus the check-in clock and enquiry formatting.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, Utc};
use shared::{
    AttendanceResponse, LoginResponse, Notification, NotificationEnquiryResponse, TerritoryHistoryResponse,
    TrackingResponse,
};

use crate::api::sign_in::ProfileUpdate;
use crate::api::{ApiClient, ApiResult, Attachment};
use crate::session::{LoginLocation, SessionStore};

pub const COMPANY_NAME: &str = "Prime Technologies";
pub const NOTIFICATION_PREVIEW: usize = 5;
pub const ENQUIRY_DAYS: i64 = 30;
const NOT_CHECKED_IN: &str = "Not Checked In";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileSummary {
    pub user_name: String,
    pub company_name: String,
    pub department: String,
    pub designation: String,
    pub employee_code: String,
    pub email_address: String,
    pub mobile_no: String,
    pub staff_id: String,
    pub user_id: String,
    pub today_check_in: String,
    pub time_duration: String,
}

impl From<&LoginResponse> for ProfileSummary {
    fn from(info: &LoginResponse) -> Self {
        let or_unknown = |v: &Option<String>| {
            v.clone()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| "Unknown".to_string())
        };
        Self {
            user_name: or_unknown(&info.user_name),
            company_name: COMPANY_NAME.to_string(),
            department: or_unknown(&info.department),
            designation: or_unknown(&info.designation),
            employee_code: or_unknown(&info.employee_code),
            email_address: or_unknown(&info.email_address),
            mobile_no: or_unknown(&info.mobile_no),
            staff_id: or_unknown(&info.staff_id),
            user_id: or_unknown(&info.user_id),
            today_check_in: info.today_check_in.clone().unwrap_or_default(),
            time_duration: info.time_duration.clone().unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttendanceSummary {
    pub today_check_in: String,
    pub working_hours: String,
    pub status: String,
}

impl Default for AttendanceSummary {
    fn default() -> Self {
        Self {
            today_check_in: String::new(),
            working_hours: String::new(),
            status: NOT_CHECKED_IN.to_string(),
        }
    }
}

impl From<AttendanceResponse> for AttendanceSummary {
    fn from(resp: AttendanceResponse) -> Self {
        Self {
            today_check_in: resp.today_check_in.unwrap_or_default(),
            working_hours: resp.working_hours.unwrap_or_default(),
            status: resp
                .attendance_status
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| NOT_CHECKED_IN.to_string()),
        }
    }
}

/// Result of one refresh. Each branch succeeds or fails on its own.
#[derive(Debug)]
pub struct DashboardSnapshot {
    pub profile: Option<ProfileSummary>,
    pub photo_url: ApiResult<reqwest::Url>,
    pub notifications: ApiResult<Vec<Notification>>,
    pub attendance: ApiResult<AttendanceSummary>,
}

impl DashboardSnapshot {
    pub fn unread_count(&self) -> usize {
        self.notifications
            .as_ref()
            .map(|list| list.iter().filter(|n| !n.is_read).count())
            .unwrap_or(0)
    }

    pub fn preview(&self) -> &[Notification] {
        match &self.notifications {
            Ok(list) => &list[..list.len().min(NOTIFICATION_PREVIEW)],
            Err(_) => &[],
        }
    }

    /// Attendance check-in when known, else the one from the login profile
    pub fn check_in(&self) -> &str {
        let from_attendance = self
            .attendance
            .as_ref()
            .map(|a| a.today_check_in.as_str())
            .unwrap_or("");
        if !from_attendance.is_empty() {
            return from_attendance;
        }
        self.profile
            .as_ref()
            .map(|p| p.today_check_in.as_str())
            .unwrap_or("")
    }

    pub fn attendance_or_default(&self) -> AttendanceSummary {
        self.attendance.as_ref().cloned().unwrap_or_default()
    }
}

/// Load every dashboard branch concurrently and wait for all of them
pub async fn refresh(client: &ApiClient, sessions: &SessionStore) -> ApiResult<DashboardSnapshot> {
    let session = sessions.session()?;
    let employee_code = sessions.employee_code();

    let (profile, photo_url, notifications, attendance) = tokio::join!(
        async { sessions.login_data().map(|l| ProfileSummary::from(&l.user_info)) },
        async { client.user_image_url(session) },
        client.notifications(session, &employee_code),
        async {
            client
                .attendance(session, &employee_code)
                .await
                .map(AttendanceSummary::from)
        },
    );

    for (branch, err) in [
        ("photo", photo_url.as_ref().err()),
        ("notifications", notifications.as_ref().err()),
        ("attendance", attendance.as_ref().err()),
    ] {
        if let Some(e) = err {
            tracing::warn!("Dashboard {} refresh failed: {}", branch, e);
        }
    }

    Ok(DashboardSnapshot {
        profile,
        photo_url,
        notifications,
        attendance,
    })
}

// ============================================================================
// Check-in clock
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckInInfo {
    /// 12-hour clock, e.g. `4:57`
    pub time: String,
    pub period: String,
    pub date: String,
    /// Elapsed since check-in, `HH:MM:SS`
    pub duration: String,
}

impl CheckInInfo {
    fn unavailable(date: &str) -> Self {
        Self {
            time: "--:--".to_string(),
            period: String::new(),
            date: date.to_string(),
            duration: "--".to_string(),
        }
    }
}

/// Parse a check-in value as local time. Accepts `DD/MM/YYYY h:mm AM` and RFC 3339.
pub fn parse_check_in(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if value.contains('/') {
        return NaiveDateTime::parse_from_str(value, "%d/%m/%Y %I:%M %p")
            .or_else(|_| NaiveDateTime::parse_from_str(value, "%d/%m/%Y %H:%M"))
            .ok();
    }
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Local).naive_local())
}

/// Check-in display for `check_in`, falling back to the login time
pub fn check_in_info(check_in: &str, login_time: Option<DateTime<Utc>>, now: DateTime<Local>) -> CheckInInfo {
    let login_local = login_time.map(|t| t.with_timezone(&Local).naive_local());
    check_in_at(check_in, login_local, now.naive_local())
}

fn check_in_at(check_in: &str, login_time: Option<NaiveDateTime>, now: NaiveDateTime) -> CheckInInfo {
    let start = if check_in.trim().is_empty() {
        match login_time {
            Some(t) => t,
            None => return CheckInInfo::unavailable("Not logged in"),
        }
    } else {
        match parse_check_in(check_in) {
            Some(t) => t,
            None => {
                tracing::debug!("Unparseable check-in time: {}", check_in);
                return CheckInInfo::unavailable("Invalid date");
            }
        }
    };

    CheckInInfo {
        time: start.format("%-I:%M").to_string(),
        period: start.format("%p").to_string(),
        date: start.format("%d/%m/%Y").to_string(),
        duration: elapsed(start, now),
    }
}

/// `HH:MM:SS` from `start` to `now`, zero if `now` is earlier
pub fn elapsed(start: NaiveDateTime, now: NaiveDateTime) -> String {
    let secs = (now - start).num_seconds().max(0);
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}

// ============================================================================
// Enquiries and profile
// ============================================================================

/// `(from, to)` covering the last thirty days up to `today`
pub fn enquiry_window(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    (today - chrono::Duration::days(ENQUIRY_DAYS), today)
}

/// Where the current session signed in from
pub fn format_login_place(location: &LoginLocation) -> String {
    format!("{} ({}, {})", location.location, location.latitude, location.longitude)
}

pub fn format_tracking(resp: &TrackingResponse) -> String {
    if resp.tracking_list.is_empty() {
        return "No tracking data available".to_string();
    }
    resp.tracking_list
        .iter()
        .map(|t| {
            format!(
                "{}: {}",
                t.timestamp,
                t.location.as_deref().filter(|l| !l.is_empty()).unwrap_or("Unknown location")
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_territories(resp: &TerritoryHistoryResponse) -> String {
    if resp.territory_list.is_empty() {
        return "No territory visits found".to_string();
    }
    resp.territory_list
        .iter()
        .map(|t| format!("{}: {}", t.visit_date, t.territory))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_notification_history(resp: &NotificationEnquiryResponse) -> String {
    if resp.notification_list.is_empty() {
        return "No notifications found".to_string();
    }
    resp.notification_list
        .iter()
        .map(|n| format!("{}: {}", n.message_date, n.message_title))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Profile form pre-filled from the login data; the password starts empty
pub fn profile_form(info: &LoginResponse) -> ProfileUpdate {
    ProfileUpdate {
        name: info.user_name.clone().unwrap_or_default(),
        mobile: info.mobile_no.clone().unwrap_or_default(),
        email: info.email_address.clone().unwrap_or_default(),
        password: String::new(),
        photo: None,
    }
}

pub fn profile_photo(path: &str) -> Attachment {
    let mut photo = Attachment::image(path, "profile.jpg");
    photo.file_name = "profile.jpg".to_string();
    photo.mime = "image/jpeg".to_string();
    photo
}
