use std::io::Write;
use std::time::Duration;

use anyhow::Result;
use chrono::Local;
use tokio::io::AsyncBufRead;
use tokio::time::MissedTickBehavior;

use super::{dim, failure, heading, notice, success, Console, InputClosed};
use crate::api::{ApiError, ApiResult};
use crate::app::{ActionError, App};
use crate::dashboard::{self, CheckInInfo, DashboardSnapshot};

pub async fn show<R: AsyncBufRead + Unpin>(app: &mut App, console: &mut Console<R>) -> Result<()> {
    if !app.sessions().is_logged_in() {
        failure("Not Logged In", "Please login first");
        return Ok(());
    }
    let mut snapshot = load(app).await?;

    loop {
        println!();
        println!("  1) Refresh          2) Session clock     3) Notifications");
        println!("  4) Live tracking    5) Territory history 6) Notification history");
        println!("  7) Update profile   8) Service report    9) Sign out");
        match console.prompt("Select").await?.as_str() {
            "1" => snapshot = load(app).await?,
            "2" => session_clock(app, &snapshot, console).await?,
            "3" => notifications(&snapshot),
            "4" => print_enquiry("📍 Live Tracking", live_tracking(app).await),
            "5" => print_enquiry("🗺  Territory History (30 days)", territory_history(app).await),
            "6" => print_enquiry("🔔 Notification History (30 days)", notification_history(app).await),
            "7" => {
                if update_profile(app, console).await? {
                    snapshot = load(app).await?;
                }
            }
            "8" => super::report::show(console).await?,
            "9" => {
                if console.confirm("Are you sure you want to logout?").await? {
                    if let Err(e) = app.sign_out().await {
                        dim(&format!("Sign out reported: {}", e));
                    }
                    success("Signed out");
                    return Ok(());
                }
            }
            _ => notice("Please choose 1-9"),
        }
    }
}

async fn load(app: &App) -> Result<DashboardSnapshot> {
    let snapshot = app.refresh_dashboard().await?;
    render(app, &snapshot);
    Ok(snapshot)
}

fn check_in(app: &App, snapshot: &DashboardSnapshot) -> CheckInInfo {
    let login_time = app.sessions().session().ok().map(|s| s.login_timestamp);
    dashboard::check_in_info(snapshot.check_in(), login_time, Local::now())
}

fn render(app: &App, snapshot: &DashboardSnapshot) {
    heading("🏠 Dashboard");
    if let Some(profile) = &snapshot.profile {
        println!("  \x1b[1m{}\x1b[0m  ({})", profile.user_name, profile.designation);
        println!("  {} · {}", profile.department, profile.company_name);
        println!("  Employee code: {}   Staff ID: {}", profile.employee_code, profile.staff_id);
        println!("  {}   {}", profile.email_address, profile.mobile_no);
    }
    match &snapshot.photo_url {
        Ok(url) => dim(&format!("  Photo: {}", url)),
        Err(e) => dim(&format!("  Photo unavailable: {}", e)),
    }
    if let Some(login) = app.sessions().login_data() {
        dim(&format!("  Signed in from {}", dashboard::format_login_place(&login.location)));
    }

    let info = check_in(app, snapshot);
    let attendance = snapshot.attendance_or_default();
    println!();
    println!("  Check-in: {} {}  {}", info.time, info.period, info.date);
    println!("  Session:  {}", info.duration);
    if !attendance.working_hours.is_empty() {
        println!("  Working hours: {}", attendance.working_hours);
    }
    println!("  Status: {}", attendance.status);

    println!();
    match &snapshot.notifications {
        Ok(_) => {
            println!("  🔔 {} unread", snapshot.unread_count());
            for n in snapshot.preview() {
                let marker = if n.is_read { " " } else { "•" };
                println!("   {} {}  \x1b[90m{}\x1b[0m", marker, n.message_title, n.message_date);
            }
        }
        Err(e) => dim(&format!("  Notifications unavailable: {}", e)),
    }
}

/// Tick the session duration once per second until Enter
async fn session_clock<R: AsyncBufRead + Unpin>(
    app: &App,
    snapshot: &DashboardSnapshot,
    console: &mut Console<R>,
) -> Result<()> {
    dim("Press Enter to stop");
    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let info = check_in(app, snapshot);
                print!("\r  ⏱  {}  (since {} {})  ", info.duration, info.time, info.period);
                std::io::stdout().flush()?;
            }
            line = console.next_line() => {
                println!();
                return match line? {
                    Some(_) => Ok(()),
                    None => Err(InputClosed.into()),
                };
            }
        }
    }
}

fn notifications(snapshot: &DashboardSnapshot) {
    heading("🔔 Notifications");
    match &snapshot.notifications {
        Ok(list) if list.is_empty() => println!("  No notifications"),
        Ok(list) => {
            for n in list {
                let marker = if n.is_read { " " } else { "•" };
                println!("  {} {} \x1b[90m{}\x1b[0m", marker, n.message_title, n.message_date);
                if !n.message_details.is_empty() {
                    println!("    {}", n.message_details);
                }
            }
        }
        Err(e) => {
            let (title, message) = e.friendly();
            failure(title, &message);
        }
    }
}

async fn live_tracking(app: &App) -> ApiResult<String> {
    let session = app.sessions().session()?;
    let today = Local::now().date_naive();
    let resp = app
        .client()
        .live_tracking(session, &app.sessions().employee_code(), today)
        .await?;
    Ok(dashboard::format_tracking(&resp))
}

async fn territory_history(app: &App) -> ApiResult<String> {
    let session = app.sessions().session()?;
    let (from, to) = dashboard::enquiry_window(Local::now().date_naive());
    let resp = app
        .client()
        .territory_history(session, &app.sessions().employee_code(), from, to)
        .await?;
    Ok(dashboard::format_territories(&resp))
}

async fn notification_history(app: &App) -> ApiResult<String> {
    let session = app.sessions().session()?;
    let (from, to) = dashboard::enquiry_window(Local::now().date_naive());
    let resp = app
        .client()
        .notification_history(session, &app.sessions().employee_code(), from, to)
        .await?;
    Ok(dashboard::format_notification_history(&resp))
}

fn print_enquiry(title: &str, result: ApiResult<String>) {
    heading(title);
    match result {
        Ok(text) => {
            for line in text.lines() {
                println!("  {}", line);
            }
        }
        Err(ApiError::Application { message, .. }) => notice(&format!("  {}", message)),
        Err(e) => {
            let (title, message) = e.friendly();
            failure(title, &message);
        }
    }
}

/// Returns whether the profile changed
async fn update_profile<R: AsyncBufRead + Unpin>(app: &App, console: &mut Console<R>) -> Result<bool> {
    let Some(login) = app.sessions().login_data() else {
        failure("Not Logged In", "Please login first");
        return Ok(false);
    };
    let mut update = dashboard::profile_form(&login.user_info);

    heading("👤 Update Profile");
    update.name = console.prompt_default("Name", &update.name).await?;
    update.mobile = console.prompt_default("Mobile", &update.mobile).await?;
    update.email = console.prompt_default("Email", &update.email).await?;
    update.password = console.prompt("New password (Enter to keep)").await?;
    let photo = console.prompt("Photo file (optional, Enter to skip)").await?;
    if !photo.is_empty() {
        update.photo = Some(dashboard::profile_photo(&photo));
    }

    dim("Updating profile...");
    match app.update_profile(&update).await {
        Ok(()) => {
            success("Profile updated successfully!");
            Ok(true)
        }
        Err(ActionError::Validation(e)) => {
            failure("Error", &e.to_string());
            Ok(false)
        }
        Err(ActionError::Api(ApiError::Application { message, .. })) => {
            failure("Error", &message);
            Ok(false)
        }
        Err(ActionError::Api(e)) => {
            tracing::error!("Profile update error: {}", e);
            failure("Error", "Failed to update profile. Please try again.");
            Ok(false)
        }
    }
}
