//! Six-cell OTP entry with a resend countdown

use thiserror::Error;

use crate::validation::{self, ValidationError};

pub const OTP_LEN: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpPhase {
    /// Countdown running, resend disabled
    Entering,
    /// Countdown reached zero
    ResendEligible,
    Verifying,
    Verified,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OtpError {
    #[error("Only one character can be entered per cell")]
    MultipleChars,

    #[error("Cell {0} does not exist")]
    NoSuchCell(usize),

    #[error("The OTP has at most 6 digits")]
    TooLong,

    #[error("The code cannot be changed while it is being verified")]
    Locked,

    #[error("Resend is not available yet")]
    ResendNotAvailable,

    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

#[derive(Debug, Clone)]
pub struct OtpEntry {
    cells: [Option<char>; OTP_LEN],
    focus: usize,
    countdown: u32,
    phase: OtpPhase,
}

impl OtpEntry {
    pub fn new(countdown_secs: u32) -> Self {
        Self {
            cells: [None; OTP_LEN],
            focus: 0,
            countdown: countdown_secs,
            phase: if countdown_secs == 0 {
                OtpPhase::ResendEligible
            } else {
                OtpPhase::Entering
            },
        }
    }

    pub fn phase(&self) -> OtpPhase {
        self.phase
    }

    pub fn focus(&self) -> usize {
        self.focus
    }

    pub fn countdown(&self) -> u32 {
        self.countdown
    }

    pub fn cells(&self) -> &[Option<char>; OTP_LEN] {
        &self.cells
    }

    pub fn can_resend(&self) -> bool {
        self.phase == OtpPhase::ResendEligible
    }

    /// Whether the one-second timer still has work to do
    pub fn timer_running(&self) -> bool {
        self.phase == OtpPhase::Entering && self.countdown > 0
    }

    fn editable(&self) -> Result<(), OtpError> {
        match self.phase {
            OtpPhase::Verifying | OtpPhase::Verified => Err(OtpError::Locked),
            OtpPhase::Entering | OtpPhase::ResendEligible => Ok(()),
        }
    }

    /// Text change event on one cell. An empty value clears the cell; a
    /// value moves focus to the next cell.
    pub fn input(&mut self, index: usize, value: &str) -> Result<(), OtpError> {
        self.editable()?;
        if index >= OTP_LEN {
            return Err(OtpError::NoSuchCell(index));
        }
        let mut chars = value.chars();
        let (first, rest) = (chars.next(), chars.next());
        if rest.is_some() {
            return Err(OtpError::MultipleChars);
        }

        self.cells[index] = first;
        self.focus = index;
        if first.is_some() && index < OTP_LEN - 1 {
            self.focus = index + 1;
        }
        Ok(())
    }

    /// Backspace key on a cell: clears it, or moves back from an empty one
    pub fn backspace(&mut self, index: usize) -> Result<(), OtpError> {
        self.editable()?;
        if index >= OTP_LEN {
            return Err(OtpError::NoSuchCell(index));
        }
        if self.cells[index].is_some() {
            self.cells[index] = None;
            self.focus = index;
        } else if index > 0 {
            self.focus = index - 1;
        }
        Ok(())
    }

    /// Type a whole code one keystroke at a time, starting from a clear entry
    pub fn fill(&mut self, code: &str) -> Result<(), OtpError> {
        self.editable()?;
        if code.chars().count() > OTP_LEN {
            return Err(OtpError::TooLong);
        }
        self.clear();
        for (i, c) in code.chars().enumerate() {
            let mut buf = [0u8; 4];
            self.input(i, c.encode_utf8(&mut buf))?;
        }
        Ok(())
    }

    pub fn code(&self) -> String {
        self.cells.iter().flatten().collect()
    }

    fn clear(&mut self) {
        self.cells = [None; OTP_LEN];
        self.focus = 0;
    }

    /// One second elapsed
    pub fn tick(&mut self) -> OtpPhase {
        if self.timer_running() {
            self.countdown -= 1;
            if self.countdown == 0 {
                self.phase = OtpPhase::ResendEligible;
            }
        }
        self.phase
    }

    /// Validate the entered code and lock the cells. Returns the code to send.
    pub fn begin_submit(&mut self) -> Result<String, OtpError> {
        self.editable()?;
        let code = self.code();
        // Empty cells are skipped by `code`, so a gap shows up as a short code
        if self.cells.iter().any(Option::is_none) {
            return Err(ValidationError::OtpIncomplete.into());
        }
        validation::otp(&code)?;
        self.phase = OtpPhase::Verifying;
        Ok(code)
    }

    /// Verification rejected: clear the cells and start over from the first.
    /// The countdown keeps its value.
    pub fn submit_failed(&mut self) {
        self.clear();
        self.phase = if self.countdown == 0 {
            OtpPhase::ResendEligible
        } else {
            OtpPhase::Entering
        };
    }

    pub fn submit_succeeded(&mut self) {
        self.phase = OtpPhase::Verified;
    }

    /// A new OTP was issued: restart the countdown with empty cells
    pub fn resend_succeeded(&mut self, countdown_secs: u32) -> Result<(), OtpError> {
        if !self.can_resend() {
            return Err(OtpError::ResendNotAvailable);
        }
        self.clear();
        self.countdown = countdown_secs;
        self.phase = OtpPhase::Entering;
        Ok(())
    }
}

/// `m:ss`, e.g. `2:00`, `0:05`
pub fn format_countdown(secs: u32) -> String {
    format!("{}:{:02}", secs / 60, secs % 60)
}
