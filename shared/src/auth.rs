//! Stub sign-up and sign-in. Nothing here talks to a server: the forms are
//! checked locally and accepted.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::countdown::PinCode;
use crate::session::{Role, UserProfile};
use crate::{AppError, ErrorKind};

pub const MIN_PHONE_LENGTH: usize = 10;
pub const OTP_LENGTH: usize = 6;
pub const AADHAAR_LENGTH: usize = 12;
pub const MIN_AGE: u8 = 13;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    #[error("Enter a valid phone number")]
    InvalidPhone,

    #[error("Invalid OTP")]
    InvalidOtp,

    #[error("Please verify OTP first")]
    OtpNotVerified,

    #[error("Aadhaar must be 12 digits")]
    InvalidAadhaar,

    #[error("Age must be at least 13")]
    TooYoung,

    #[error("PIN must be 4 digits")]
    InvalidPin,

    #[error("Passwords do not match")]
    PasswordMismatch,

    #[error("Please accept the consent")]
    ConsentRequired,

    #[error("Name is required")]
    MissingName,
}

impl From<RegistrationError> for AppError {
    fn from(e: RegistrationError) -> Self {
        AppError::new(ErrorKind::Validation, e.to_string())
    }
}

/// Progress of the one-time-password step of sign-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OtpState {
    #[default]
    NotSent,
    Sent,
    Verified,
}

impl OtpState {
    pub fn send(&mut self, phone: &str) -> Result<(), RegistrationError> {
        if phone.trim().chars().count() < MIN_PHONE_LENGTH {
            return Err(RegistrationError::InvalidPhone);
        }
        if *self != Self::Verified {
            *self = Self::Sent;
        }
        Ok(())
    }

    /// Any code of the right length verifies.
    pub fn verify(&mut self, code: &str) -> Result<(), RegistrationError> {
        if *self == Self::NotSent || code.trim().chars().count() != OTP_LENGTH {
            return Err(RegistrationError::InvalidOtp);
        }
        *self = Self::Verified;
        Ok(())
    }

    #[must_use]
    pub const fn is_verified(self) -> bool {
        matches!(self, Self::Verified)
    }
}

#[derive(Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct RegistrationForm {
    pub name: String,
    pub phone: String,
    pub aadhaar: String,
    pub gender: String,
    pub age: String,
    pub pin: String,
    pub password: String,
    pub confirm_password: String,
    pub consent: bool,
}

impl std::fmt::Debug for RegistrationForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistrationForm")
            .field("name", &self.name)
            .field("phone", &self.phone)
            .field("consent", &self.consent)
            .finish_non_exhaustive()
    }
}

impl RegistrationForm {
    /// Checks the form in the order the sign-up screen reports problems.
    pub fn validate(&self, otp: OtpState) -> Result<(UserProfile, PinCode), RegistrationError> {
        if !otp.is_verified() {
            return Err(RegistrationError::OtpNotVerified);
        }
        let aadhaar = self.aadhaar.trim();
        if aadhaar.len() != AADHAAR_LENGTH || !aadhaar.chars().all(|c| c.is_ascii_digit()) {
            return Err(RegistrationError::InvalidAadhaar);
        }
        let age = self
            .age
            .trim()
            .parse::<u8>()
            .ok()
            .filter(|age| *age >= MIN_AGE)
            .ok_or(RegistrationError::TooYoung)?;
        let pin = PinCode::parse(self.pin.trim()).map_err(|_| RegistrationError::InvalidPin)?;
        if self.password != self.confirm_password {
            return Err(RegistrationError::PasswordMismatch);
        }
        if !self.consent {
            return Err(RegistrationError::ConsentRequired);
        }
        let name = self.name.trim();
        if name.is_empty() {
            return Err(RegistrationError::MissingName);
        }

        let profile = UserProfile {
            name: name.to_string(),
            phone: self.phone.trim().to_string(),
            age,
            gender: self.gender.trim().to_string(),
            role: Role::User,
        };
        Ok((profile, pin))
    }
}

#[derive(Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct LoginForm {
    pub phone: String,
    pub password: String,
}

impl std::fmt::Debug for LoginForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginForm")
            .field("phone", &self.phone)
            .finish_non_exhaustive()
    }
}

impl LoginForm {
    /// Accepts any submission with a phone number.
    pub fn accept(&self) -> Result<UserProfile, RegistrationError> {
        let phone = self.phone.trim();
        if phone.is_empty() {
            return Err(RegistrationError::InvalidPhone);
        }
        Ok(UserProfile {
            name: String::new(),
            phone: phone.to_string(),
            age: 0,
            gender: String::new(),
            role: Role::User,
        })
    }
}
