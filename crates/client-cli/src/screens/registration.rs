//! Registration wizard: staff details, OTP entry with a resend countdown,
//! then username and password.

use std::time::Duration;

use anyhow::Result;
use tokio::io::AsyncBufRead;
use tokio::time::MissedTickBehavior;

use super::{dim, failure, heading, notice, success, Console, InputClosed};
use crate::api::registration::outcome_code;
use crate::api::Attachment;
use crate::app::App;
use crate::otp::{format_countdown, OtpEntry, OtpPhase, OTP_LEN};
use crate::registration::{
    CompletionOutcome, Credentials, FlowError, RegistrationDraft, RegistrationFlow, RegistrationStep, StepInput, Title,
};

/// Seconds between countdown reminders while the OTP is pending
const REMINDER_EVERY: u32 = 30;

pub async fn show<R: AsyncBufRead + Unpin>(app: &App, console: &mut Console<R>) -> Result<()> {
    heading("📝 Staff Registration");
    let draft = read_draft(console, &RegistrationDraft::default()).await?;
    let mut flow = app.registration(draft);

    loop {
        dim("Sending registration request...");
        match flow.advance(StepInput::Request).await {
            Ok(_) => {
                success("Registration request sent. Check your mobile or e-mail for the OTP.");
                if let Some(device) = flow.device() {
                    dim(&format!("Registering device {} ({})", device.model, device.device_id));
                }
                break;
            }
            Err(e) => report(&e),
        }
        if !console.confirm("Edit your details and try again?").await? {
            return Ok(());
        }
        let edited = read_draft(console, flow.draft()).await?;
        if let Some(draft) = flow.draft_mut() {
            *draft = edited;
        }
    }

    let countdown = app.config().registration.otp_countdown_secs;
    if !enter_otp(&mut flow, console, countdown).await? {
        notice("Registration cancelled");
        return Ok(());
    }

    set_credentials(&mut flow, console).await
}

async fn read_draft<R: AsyncBufRead + Unpin>(
    console: &mut Console<R>,
    current: &RegistrationDraft,
) -> Result<RegistrationDraft> {
    let mut draft = current.clone();

    let title = console.prompt_default("Title (Mr./Mrs.)", &current.title.to_string()).await?;
    match title.parse::<Title>() {
        Ok(t) => draft.title = t,
        Err(e) => notice(&format!("{}, keeping {}", e, current.title)),
    }
    draft.user_name = console.prompt_default("Full name", &current.user_name).await?;
    draft.staff_id = console.prompt_default("Staff ID", &current.staff_id).await?;
    draft.mobile_no = console.prompt_default("Mobile number", &current.mobile_no).await?;
    draft.email = console.prompt_default("E-mail", &current.email).await?;
    draft.is_company_device = console.confirm("Is this a company device?").await?;

    let photo = console.prompt("Photo file (optional, Enter to skip)").await?;
    if !photo.is_empty() {
        draft.photo = Some(Attachment::image(photo, "photo.jpg"));
    }
    Ok(draft)
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum OtpCommand {
    Code(String),
    /// 1-based cell and the character typed into it
    Cell(usize, String),
    Delete(usize),
    Submit,
    Resend,
    Status,
    Cancel,
    Help,
}

fn parse_otp_command(line: &str) -> OtpCommand {
    let line = line.trim();
    match line.to_ascii_lowercase().as_str() {
        "" | "status" => return OtpCommand::Status,
        "submit" | "verify" => return OtpCommand::Submit,
        "resend" => return OtpCommand::Resend,
        "cancel" | "back" => return OtpCommand::Cancel,
        "help" | "?" => return OtpCommand::Help,
        _ => {}
    }

    let parts: Vec<&str> = line.split_whitespace().collect();
    match parts.as_slice() {
        ["del", cell] => match cell.parse() {
            Ok(n) if n > 0 => OtpCommand::Delete(n),
            _ => OtpCommand::Help,
        },
        [cell, value] if value.chars().count() == 1 => match cell.parse() {
            Ok(n) if (1..=OTP_LEN).contains(&n) => OtpCommand::Cell(n, value.to_string()),
            _ => code_command(line),
        },
        _ => code_command(line),
    }
}

/// A code typed in groups, e.g. "123 456", is one code
fn code_command(line: &str) -> OtpCommand {
    if line.chars().all(|c| c.is_ascii_digit() || c.is_whitespace()) {
        return OtpCommand::Code(line.split_whitespace().collect());
    }
    OtpCommand::Code(line.to_string())
}

fn render_cells(otp: &OtpEntry) -> String {
    otp.cells()
        .iter()
        .map(|c| format!("[{}]", c.unwrap_or(' ')))
        .collect()
}

fn show_otp(otp: &OtpEntry) {
    let status = match otp.phase() {
        OtpPhase::Entering => format!("resend in {}", format_countdown(otp.countdown())),
        OtpPhase::ResendEligible => "type 'resend' for a new code".to_string(),
        OtpPhase::Verifying => "verifying".to_string(),
        OtpPhase::Verified => "verified".to_string(),
    };
    println!("  OTP {}  cell {}  ({})", render_cells(otp), otp.focus() + 1, status);
}

fn otp_help() {
    dim(&format!("Type the {}-digit code, or edit one cell with '<cell> <digit>'.", OTP_LEN));
    dim("Other commands: del <cell>, submit, resend, status, cancel");
}

/// Returns `false` when the user gave up
async fn enter_otp<R: AsyncBufRead + Unpin>(
    flow: &mut RegistrationFlow,
    console: &mut Console<R>,
    countdown_secs: u32,
) -> Result<bool> {
    let mut otp = OtpEntry::new(countdown_secs);
    otp_help();
    show_otp(&otp);

    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick(), if otp.timer_running() => {
                if otp.tick() == OtpPhase::ResendEligible {
                    notice("Didn't receive the code? Type 'resend' to get a new one.");
                } else if otp.countdown() % REMINDER_EVERY == 0 {
                    dim(&format!("Resend available in {}", format_countdown(otp.countdown())));
                }
            }
            line = console.next_line() => {
                let Some(line) = line? else {
                    return Err(InputClosed.into());
                };
                match parse_otp_command(&line) {
                    OtpCommand::Code(code) => match otp.fill(&code) {
                        Ok(()) => {
                            if verify(flow, &mut otp).await {
                                return Ok(true);
                            }
                        }
                        Err(e) => failure("Invalid OTP", &e.to_string()),
                    },
                    OtpCommand::Cell(cell, value) => match otp.input(cell - 1, &value) {
                        Ok(()) => show_otp(&otp),
                        Err(e) => failure("Invalid OTP", &e.to_string()),
                    },
                    OtpCommand::Delete(cell) => match otp.backspace(cell - 1) {
                        Ok(()) => show_otp(&otp),
                        Err(e) => failure("Invalid OTP", &e.to_string()),
                    },
                    OtpCommand::Submit => {
                        if verify(flow, &mut otp).await {
                            return Ok(true);
                        }
                    }
                    OtpCommand::Resend => resend(flow, &mut otp, countdown_secs).await,
                    OtpCommand::Status => show_otp(&otp),
                    OtpCommand::Cancel => return Ok(false),
                    OtpCommand::Help => otp_help(),
                }
            }
        }
    }
}

async fn verify(flow: &mut RegistrationFlow, otp: &mut OtpEntry) -> bool {
    let code = match otp.begin_submit() {
        Ok(code) => code,
        Err(e) => {
            failure("Invalid OTP", &e.to_string());
            return false;
        }
    };

    dim("Verifying OTP...");
    match flow.advance(StepInput::Otp(code)).await {
        Ok(_) => {
            otp.submit_succeeded();
            success("OTP verified successfully!");
            true
        }
        Err(e) => {
            otp.submit_failed();
            report(&e);
            show_otp(otp);
            false
        }
    }
}

async fn resend(flow: &mut RegistrationFlow, otp: &mut OtpEntry, countdown_secs: u32) {
    if !otp.can_resend() {
        notice(&format!("You can request a new code in {}", format_countdown(otp.countdown())));
        return;
    }
    dim("Requesting a new OTP...");
    match flow.retry().await {
        Ok(_) => match otp.resend_succeeded(countdown_secs) {
            Ok(()) => {
                success("A new OTP has been sent");
                show_otp(otp);
            }
            Err(e) => failure("Error", &e.to_string()),
        },
        Err(e) => report(&e),
    }
}

async fn set_credentials<R: AsyncBufRead + Unpin>(flow: &mut RegistrationFlow, console: &mut Console<R>) -> Result<()> {
    heading("🔑 Choose your login");
    loop {
        let credentials = Credentials {
            username: console.prompt("Username").await?,
            password: console.prompt("Password").await?,
            confirm_password: console.prompt("Confirm password").await?,
        };

        dim("Completing registration...");
        let staff_id = flow.draft().staff_id.clone();
        match flow.advance(StepInput::Credentials(credentials)).await {
            Ok(RegistrationStep::Finished(outcome)) => {
                show_outcome(outcome, &staff_id);
                return Ok(());
            }
            Ok(step) => {
                tracing::warn!("Registration stopped at an unexpected step: {:?}", step);
                return Ok(());
            }
            Err(e) => report(&e),
        }
        if !console.confirm("Try again?").await? {
            return Ok(());
        }
    }
}

fn show_outcome(outcome: &CompletionOutcome, staff_id: &str) {
    tracing::info!("Registration finished: {}", outcome_code(outcome));
    match outcome {
        CompletionOutcome::Completed { .. } => success("Registration completed successfully!"),
        CompletionOutcome::EndpointNotFound { .. } => notice("Registration Submitted"),
    }
    for line in outcome_lines(outcome, staff_id) {
        println!("   {}", line);
    }
}

fn outcome_lines(outcome: &CompletionOutcome, staff_id: &str) -> Vec<String> {
    match outcome {
        CompletionOutcome::Completed { user_id } => vec![
            format!("Username: {}", user_id),
            format!("Staff ID: {}", staff_id),
            "You can now sign in with either your username or Staff ID.".to_string(),
        ],
        CompletionOutcome::EndpointNotFound { message } => vec![
            message.clone(),
            format!("Staff ID: {}", staff_id),
        ],
    }
}

fn report(err: &FlowError) {
    tracing::debug!("Registration step failed: {:?}", err);
    match err {
        FlowError::Validation(e) => failure("Validation Error", &e.to_string()),
        FlowError::Api(e) => {
            let (title, message) = e.friendly();
            failure(title, &message);
        }
        FlowError::RegistrationNumberMissing => failure("Verification Failed", &err.to_string()),
        FlowError::InvalidStep { .. } => failure("Error", &err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_otp_command() {
        assert_eq!(parse_otp_command("123456"), OtpCommand::Code("123456".to_string()));
        assert_eq!(parse_otp_command(" 3 7 "), OtpCommand::Cell(3, "7".to_string()));
        assert_eq!(parse_otp_command("del 2"), OtpCommand::Delete(2));
        assert_eq!(parse_otp_command("del x"), OtpCommand::Help);
        assert_eq!(parse_otp_command("RESEND"), OtpCommand::Resend);
        assert_eq!(parse_otp_command(""), OtpCommand::Status);
        assert_eq!(parse_otp_command("back"), OtpCommand::Cancel);
        assert_eq!(parse_otp_command("0 7"), OtpCommand::Code("07".to_string()));
        assert_eq!(parse_otp_command("6 x"), OtpCommand::Cell(6, "x".to_string()));
    }

    #[test]
    fn test_grouped_code_is_one_code() {
        assert_eq!(parse_otp_command("123 456"), OtpCommand::Code("123456".to_string()));
        assert_eq!(parse_otp_command(" 12 34 56 "), OtpCommand::Code("123456".to_string()));
        assert_eq!(parse_otp_command("7 1"), OtpCommand::Code("71".to_string()));
        assert_eq!(parse_otp_command("12a 456"), OtpCommand::Code("12a 456".to_string()));

        let mut otp = OtpEntry::new(120);
        let OtpCommand::Code(code) = parse_otp_command("123 456") else {
            panic!("expected a full code");
        };
        otp.fill(&code).unwrap();
        assert_eq!(otp.code(), "123456");
    }

    #[test]
    fn test_outcome_lines_show_staff_id() {
        let done = CompletionOutcome::Completed {
            user_id: "sara".to_string(),
        };
        let lines = outcome_lines(&done, "ST100");
        assert_eq!(lines[0], "Username: sara");
        assert_eq!(lines[1], "Staff ID: ST100");

        let missing = CompletionOutcome::EndpointNotFound {
            message: "Contact your administrator".to_string(),
        };
        assert_eq!(
            outcome_lines(&missing, "ST100"),
            vec!["Contact your administrator".to_string(), "Staff ID: ST100".to_string()]
        );
    }

    #[test]
    fn test_render_cells() {
        let mut otp = OtpEntry::new(120);
        otp.input(0, "4").unwrap();
        otp.input(2, "9").unwrap();
        assert_eq!(render_cells(&otp), "[4][ ][9][ ][ ][ ]");
    }

    #[tokio::test]
    async fn test_read_draft_keeps_defaults() {
        let current = RegistrationDraft {
            title: Title::Mrs,
            user_name: "Sara".to_string(),
            staff_id: "ST7".to_string(),
            mobile_no: "0500000000".to_string(),
            email: "sara@prime.ae".to_string(),
            ..Default::default()
        };
        let mut console = Console::new(&b"Dr\n\nST8\n\n\ny\n/tmp/me.png\n"[..]);
        let draft = read_draft(&mut console, &current).await.unwrap();
        assert_eq!(draft.title, Title::Mrs);
        assert_eq!(draft.user_name, "Sara");
        assert_eq!(draft.staff_id, "ST8");
        assert!(draft.is_company_device);
        assert_eq!(draft.photo.unwrap().mime, "image/png");
    }
}
