//! Emergency countdown state machine.
//!
//! A [`CountdownSession`] counts down from a fixed number of seconds and can be
//! aborted by entering the expected four digit PIN. The session owns no timer:
//! the caller delivers one [`CountdownSession::tick`] per elapsed second and
//! forwards keypad input. Once the session reaches [`Phase::Cancelled`] or
//! [`Phase::Expired`] every further call is a no-op.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::{AppError, ErrorKind, PIN_LENGTH};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CountdownError {
    #[error("countdown duration must not be negative, got {0}")]
    NegativeDuration(i64),

    #[error("countdown duration {0} exceeds the supported maximum")]
    DurationTooLong(i64),

    #[error("PIN must be exactly 4 digits")]
    InvalidPin,

    #[error("digit must be between 0 and 9, got {0}")]
    InvalidDigit(u32),
}

impl From<CountdownError> for AppError {
    fn from(e: CountdownError) -> Self {
        let kind = match e {
            CountdownError::InvalidDigit(_) => ErrorKind::Validation,
            _ => ErrorKind::InvalidConfiguration,
        };
        AppError::new(kind, e.to_string())
    }
}

/// A single keypad digit, 0 through 9.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Digit(u8);

impl Digit {
    #[must_use]
    pub const fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Digit {
    type Error = CountdownError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if value <= 9 {
            Ok(Self(value))
        } else {
            Err(CountdownError::InvalidDigit(u32::from(value)))
        }
    }
}

impl TryFrom<char> for Digit {
    type Error = CountdownError;

    fn try_from(c: char) -> Result<Self, Self::Error> {
        c.to_digit(10)
            .and_then(|d| u8::try_from(d).ok())
            .map(Self)
            .ok_or(CountdownError::InvalidDigit(u32::from(c)))
    }
}

/// The four digit code that cancels a countdown. Never printed, wiped on drop.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct PinCode([u8; PIN_LENGTH]);

impl PinCode {
    pub fn parse(raw: &str) -> Result<Self, CountdownError> {
        if raw.chars().count() != PIN_LENGTH {
            return Err(CountdownError::InvalidPin);
        }

        let mut digits = [0u8; PIN_LENGTH];
        for (slot, c) in digits.iter_mut().zip(raw.chars()) {
            *slot = Digit::try_from(c)
                .map_err(|_| CountdownError::InvalidPin)?
                .value();
        }
        Ok(Self(digits))
    }

    #[must_use]
    pub fn matches(&self, entered: &[u8]) -> bool {
        self.0.as_slice() == entered
    }
}

impl fmt::Debug for PinCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PinCode([REDACTED])")
    }
}

impl std::str::FromStr for PinCode {
    type Err = CountdownError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Validated construction parameters for a countdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountdownConfig {
    duration_seconds: u32,
    expected_pin: PinCode,
}

impl CountdownConfig {
    pub fn new(duration_seconds: i64, expected_pin: &str) -> Result<Self, CountdownError> {
        let duration_seconds = Self::validate_duration(duration_seconds)?;
        let expected_pin = PinCode::parse(expected_pin)?;
        Ok(Self {
            duration_seconds,
            expected_pin,
        })
    }

    #[must_use]
    pub fn with_pin(duration_seconds: u32, expected_pin: PinCode) -> Self {
        Self {
            duration_seconds,
            expected_pin,
        }
    }

    pub(crate) fn validate_duration(duration_seconds: i64) -> Result<u32, CountdownError> {
        if duration_seconds < 0 {
            return Err(CountdownError::NegativeDuration(duration_seconds));
        }
        u32::try_from(duration_seconds).map_err(|_| CountdownError::DurationTooLong(duration_seconds))
    }

    #[must_use]
    pub const fn duration_seconds(&self) -> u32 {
        self.duration_seconds
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Counting,
    Cancelled,
    Expired,
}

impl Phase {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Cancelled | Self::Expired)
    }
}

/// What a single input did to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Input arrived after the session ended, or delete on an empty entry.
    Ignored,
    Ticked { remaining_seconds: u32 },
    Expired,
    DigitEntered { entered: usize },
    DigitRemoved { entered: usize },
    PinRejected,
    Cancelled,
}

impl Transition {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Expired | Self::Cancelled)
    }
}

#[derive(Debug)]
pub struct CountdownSession {
    duration_seconds: u32,
    remaining_seconds: u32,
    entered_digits: Vec<u8>,
    phase: Phase,
    expected_pin: PinCode,
    ticks_processed: u32,
}

impl CountdownSession {
    /// Begins counting. A zero duration expires immediately without a tick.
    #[must_use]
    pub fn start(config: CountdownConfig) -> Self {
        let CountdownConfig {
            duration_seconds,
            expected_pin,
        } = config;

        let phase = if duration_seconds == 0 {
            Phase::Expired
        } else {
            Phase::Counting
        };

        Self {
            duration_seconds,
            remaining_seconds: duration_seconds,
            entered_digits: Vec::with_capacity(PIN_LENGTH),
            phase,
            expected_pin,
            ticks_processed: 0,
        }
    }

    pub fn tick(&mut self) -> Transition {
        if self.phase != Phase::Counting {
            return Transition::Ignored;
        }

        self.remaining_seconds = self.remaining_seconds.saturating_sub(1);
        self.ticks_processed += 1;

        if self.remaining_seconds == 0 {
            self.phase = Phase::Expired;
            self.entered_digits.zeroize();
            Transition::Expired
        } else {
            Transition::Ticked {
                remaining_seconds: self.remaining_seconds,
            }
        }
    }

    pub fn submit_digit(&mut self, digit: Digit) -> Transition {
        if self.phase != Phase::Counting {
            return Transition::Ignored;
        }

        self.entered_digits.push(digit.value());
        if self.entered_digits.len() < PIN_LENGTH {
            return Transition::DigitEntered {
                entered: self.entered_digits.len(),
            };
        }

        let matched = self.expected_pin.matches(&self.entered_digits);
        self.entered_digits.zeroize();

        if matched {
            self.phase = Phase::Cancelled;
            Transition::Cancelled
        } else {
            Transition::PinRejected
        }
    }

    pub fn delete_digit(&mut self) -> Transition {
        if self.phase != Phase::Counting {
            return Transition::Ignored;
        }

        match self.entered_digits.pop() {
            Some(_) => Transition::DigitRemoved {
                entered: self.entered_digits.len(),
            },
            None => Transition::Ignored,
        }
    }

    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub const fn remaining_seconds(&self) -> u32 {
        self.remaining_seconds
    }

    #[must_use]
    pub const fn duration_seconds(&self) -> u32 {
        self.duration_seconds
    }

    #[must_use]
    pub fn entered_len(&self) -> usize {
        self.entered_digits.len()
    }

    #[must_use]
    pub const fn ticks_processed(&self) -> u32 {
        self.ticks_processed
    }

    /// Fraction of the countdown left, for the progress ring.
    #[must_use]
    pub fn progress(&self) -> f32 {
        if self.duration_seconds == 0 {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let ratio = self.remaining_seconds as f32 / self.duration_seconds as f32;
        ratio.clamp(0.0, 1.0)
    }
}

impl Drop for CountdownSession {
    fn drop(&mut self) {
        self.entered_digits.zeroize();
    }
}
