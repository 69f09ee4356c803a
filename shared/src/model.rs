use serde::{Deserialize, Serialize};

use crate::auth::OtpState;
use crate::capabilities::TimerIds;
use crate::config::SafetyConfig;
use crate::overlay::EmergencyOverlay;
use crate::session::{sample_history, SessionStore};
use crate::{AppError, ToastKind, ToastMessage};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AppState {
    #[default]
    Unauthenticated,
    ContactsSetup,
    Ready,
}

impl AppState {
    #[must_use]
    pub const fn is_authenticated(self) -> bool {
        !matches!(self, Self::Unauthenticated)
    }
}

#[derive(Debug, Default)]
pub struct Model {
    pub state: AppState,
    pub config: SafetyConfig,
    pub session: SessionStore,
    pub otp: OtpState,
    pub panic_confirm_open: bool,
    pub overlay: Option<EmergencyOverlay>,
    pub timer_ids: TimerIds,
    pub active_error: Option<AppError>,
    pub active_toast: Option<ToastMessage>,
}

impl Model {
    #[must_use]
    pub fn with_config(config: SafetyConfig) -> Self {
        let session = if config.sample_history {
            SessionStore::with_history(sample_history())
        } else {
            SessionStore::new()
        };
        Self {
            config,
            session,
            ..Self::default()
        }
    }

    pub fn set_error(&mut self, error: impl Into<AppError>) {
        self.active_error = Some(error.into());
    }

    pub fn clear_error(&mut self) {
        self.active_error = None;
    }

    pub fn show_toast(&mut self, message: impl Into<String>, kind: ToastKind) {
        self.active_toast = Some(ToastMessage::new(message, kind));
    }

    pub fn clear_toast(&mut self) {
        self.active_toast = None;
    }

    #[must_use]
    pub fn contacts_complete(&self) -> bool {
        self.session.contacts().len() >= self.config.max_contacts
    }

    #[must_use]
    pub fn emergency_active(&self) -> bool {
        self.overlay.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_model() {
        let model = Model::default();
        assert_eq!(model.state, AppState::Unauthenticated);
        assert!(!model.emergency_active());
        assert_eq!(model.session.emergency_log_count(), 0);
    }

    #[test]
    fn test_sample_history_seeded_from_config() {
        let model = Model::with_config(SafetyConfig {
            sample_history: true,
            ..SafetyConfig::default()
        });
        assert_eq!(model.session.emergency_log_count(), 2);
    }

    #[test]
    fn test_error_and_toast_lifecycle() {
        let mut model = Model::default();
        model.set_error(AppError::new(crate::ErrorKind::Validation, "x"));
        model.show_toast("hello", ToastKind::Info);
        assert!(model.active_error.is_some());
        model.clear_error();
        model.clear_toast();
        assert!(model.active_error.is_none());
        assert!(model.active_toast.is_none());
    }
}
