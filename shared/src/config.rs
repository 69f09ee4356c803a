//! Safety settings supplied by the shell at start-up.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::countdown::{CountdownConfig, CountdownError, PinCode};
use crate::overlay::OverlayTimings;
use crate::{
    AppError, ErrorKind, DEFAULT_COUNTDOWN_SECS, DEFAULT_DISPLAY_DELAY_MS, DEFAULT_FALLBACK_PIN,
    DEFAULT_MAX_CONTACTS, DEFAULT_TICK_INTERVAL_MS,
};

/// Largest UTC offset chrono accepts, in minutes (just under a day).
const MAX_UTC_OFFSET_MINUTES: i32 = 24 * 60 - 1;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("could not parse configuration: {0}")]
    Parse(String),
}

impl From<CountdownError> for ConfigError {
    fn from(e: CountdownError) -> Self {
        Self::InvalidConfiguration(e.to_string())
    }
}

impl From<ConfigError> for AppError {
    fn from(e: ConfigError) -> Self {
        AppError::new(ErrorKind::InvalidConfiguration, e.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SafetyConfig {
    pub countdown_seconds: i64,
    pub tick_interval_ms: u64,
    pub display_delay_ms: u64,
    pub fallback_pin: String,
    pub max_contacts: usize,
    pub utc_offset_minutes: i32,
    pub sample_history: bool,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            countdown_seconds: i64::from(DEFAULT_COUNTDOWN_SECS),
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            display_delay_ms: DEFAULT_DISPLAY_DELAY_MS,
            fallback_pin: DEFAULT_FALLBACK_PIN.to_string(),
            max_contacts: DEFAULT_MAX_CONTACTS,
            utc_offset_minutes: 0,
            sample_history: false,
        }
    }
}

impl SafetyConfig {
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(raw).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        CountdownConfig::new(self.countdown_seconds, &self.fallback_pin)?;

        if self.tick_interval_ms == 0 {
            return Err(ConfigError::InvalidConfiguration(
                "tick interval must be positive".into(),
            ));
        }
        if self.max_contacts == 0 {
            return Err(ConfigError::InvalidConfiguration(
                "at least one trusted contact slot is required".into(),
            ));
        }
        if self.utc_offset_minutes.abs() > MAX_UTC_OFFSET_MINUTES {
            return Err(ConfigError::InvalidConfiguration(format!(
                "UTC offset {} minutes is out of range",
                self.utc_offset_minutes
            )));
        }
        Ok(())
    }

    /// Countdown parameters for one emergency, cancelled by `pin` when the user
    /// registered one and by the fallback PIN otherwise.
    pub fn countdown(&self, pin: Option<&PinCode>) -> Result<CountdownConfig, ConfigError> {
        let duration = CountdownConfig::validate_duration(self.countdown_seconds)?;
        let pin = match pin {
            Some(pin) => pin.clone(),
            None => PinCode::parse(&self.fallback_pin)?,
        };
        Ok(CountdownConfig::with_pin(duration, pin))
    }

    #[must_use]
    pub const fn timings(&self) -> OverlayTimings {
        OverlayTimings {
            tick_interval: Duration::from_millis(self.tick_interval_ms),
            display_delay: Duration::from_millis(self.display_delay_ms),
        }
    }
}
