// lib.rs - Guardian shared core

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::too_many_lines)]

pub mod app;
pub mod auth;
pub mod capabilities;
pub mod config;
pub mod countdown;
pub mod event;
pub mod model;
pub mod overlay;
pub mod session;
pub mod view;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

pub use app::App;
pub use capabilities::{Capabilities, Effect};
pub use config::SafetyConfig;
pub use countdown::{CountdownConfig, CountdownError, CountdownSession, Digit, Phase, PinCode};
pub use crux_core::{render::Render, App as CruxApp};
pub use event::Event;
pub use model::{AppState, Model};
pub use view::ViewModel;

pub const DEFAULT_COUNTDOWN_SECS: u32 = 30;
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 1000;
pub const DEFAULT_DISPLAY_DELAY_MS: u64 = 1500;
pub const DEFAULT_FALLBACK_PIN: &str = "1234";
pub const DEFAULT_MAX_CONTACTS: usize = 5;
pub const DEFAULT_HEART_RATE_BPM: u16 = 72;
pub const PIN_LENGTH: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorSeverity {
    Transient,
    Permanent,
    Fatal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    Validation,
    InvalidConfiguration,
    Authentication,
    LimitReached,
    Conflict,
    NotFound,
    InvalidState,
    Internal,
}

impl ErrorKind {
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Validation => "VALIDATION_ERROR",
            Self::InvalidConfiguration => "INVALID_CONFIGURATION",
            Self::Authentication => "AUTH_ERROR",
            Self::LimitReached => "LIMIT_REACHED",
            Self::Conflict => "CONFLICT",
            Self::NotFound => "NOT_FOUND",
            Self::InvalidState => "INVALID_STATE",
            Self::Internal => "INTERNAL_ERROR",
        }
    }

    #[must_use]
    pub const fn default_severity(self) -> ErrorSeverity {
        match self {
            Self::Validation
            | Self::Authentication
            | Self::LimitReached
            | Self::Conflict
            | Self::NotFound => ErrorSeverity::Transient,
            Self::InvalidConfiguration | Self::InvalidState => ErrorSeverity::Permanent,
            Self::Internal => ErrorSeverity::Fatal,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppError {
    pub kind: ErrorKind,
    pub severity: ErrorSeverity,
    pub message: String,
    pub internal_message: Option<String>,
    pub context: BTreeMap<String, String>,
}

impl AppError {
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity: kind.default_severity(),
            message: message.into(),
            internal_message: None,
            context: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_internal(mut self, internal: impl Into<String>) -> Self {
        self.internal_message = Some(internal.into());
        self
    }

    #[must_use]
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.kind.code()
    }

    #[must_use]
    pub fn user_facing_message(&self) -> String {
        match self.kind {
            ErrorKind::Validation | ErrorKind::LimitReached | ErrorKind::Conflict => {
                self.message.clone()
            }
            ErrorKind::InvalidConfiguration => {
                "The safety settings are invalid. Please review them and try again.".into()
            }
            ErrorKind::Authentication => "Please sign in to continue.".into(),
            ErrorKind::NotFound => "The requested item could not be found.".into(),
            ErrorKind::InvalidState => {
                "That action is not available right now. Please try again.".into()
            }
            ErrorKind::Internal => {
                "An unexpected error occurred. Please restart the app.".into()
            }
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code(), self.message)?;
        if let Some(internal) = &self.internal_message {
            write!(f, " (internal: {internal})")?;
        }
        Ok(())
    }
}

impl std::error::Error for AppError {}

pub type AppResult<T> = Result<T, AppError>;

macro_rules! typed_id {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            #[must_use]
            pub fn generate() -> Self {
                Self(Uuid::new_v4().to_string())
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

typed_id!(ContactId);
typed_id!(LogEntryId);

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToastMessage {
    pub message: String,
    pub kind: ToastKind,
    pub duration_ms: u64,
}

impl ToastMessage {
    #[must_use]
    pub fn new(message: impl Into<String>, kind: ToastKind) -> Self {
        Self {
            message: message.into(),
            kind,
            duration_ms: kind.default_duration_ms(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ToastKind {
    #[default]
    Info,
    Success,
    Warning,
    Error,
}

impl ToastKind {
    #[must_use]
    pub const fn default_duration_ms(self) -> u64 {
        match self {
            Self::Info => 3000,
            Self::Success => 2000,
            Self::Warning => 4000,
            Self::Error => 5000,
        }
    }
}
