//! Notifications and the three dashboard enquiries

use chrono::NaiveDate;
use shared::{Notification, NotificationEnquiryResponse, TerritoryHistoryResponse, TrackingResponse};

use super::{session_form, ApiClient, ApiResult, FormFields};
use crate::session::Session;

const NOTIFICATIONS: &str = "ViewNotificationService/pushNotificationData";
const LIVE_TRACKING: &str = "LiveTrackingService/liveTracking";
const TERRITORY_HISTORY: &str = "EnquiryTerritoryHistoryService/territoryHistory";
const NOTIFICATION_HISTORY: &str = "EnquiryNotificationService/pushNotificationEnquiry";

/// Backend date format, `DD/MM/YYYY`
pub fn format_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

fn employee_form(session: &Session, employee_code: &str) -> FormFields {
    session_form(session).text("sEmployeeCode", employee_code)
}

impl ApiClient {
    /// Current notifications; the reply is a bare JSON array
    pub async fn notifications(&self, session: &Session, employee_code: &str) -> ApiResult<Vec<Notification>> {
        self.call_uncoded(NOTIFICATIONS, &employee_form(session, employee_code))
            .await
    }

    pub async fn live_tracking(
        &self,
        session: &Session,
        employee_code: &str,
        date: NaiveDate,
    ) -> ApiResult<TrackingResponse> {
        let form = session_form(session)
            .text("sProcessDate", format_date(date))
            .text("sEmployeeCode", employee_code);
        self.call(LIVE_TRACKING, &form, "No tracking data available for today")
            .await
    }

    pub async fn territory_history(
        &self,
        session: &Session,
        employee_code: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> ApiResult<TerritoryHistoryResponse> {
        let form = session_form(session)
            .text("sFromDate", format_date(from))
            .text("sToDate", format_date(to))
            .text("sEmployeeCode", employee_code)
            .text("sTerritory", "");
        self.call(TERRITORY_HISTORY, &form, "No territory history available")
            .await
    }

    pub async fn notification_history(
        &self,
        session: &Session,
        employee_code: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> ApiResult<NotificationEnquiryResponse> {
        let form = session_form(session)
            .text("sFromDate", format_date(from))
            .text("sToDate", format_date(to))
            .text("sEmployeeCode", employee_code);
        self.call(NOTIFICATION_HISTORY, &form, "No notification history available")
            .await
    }
}
