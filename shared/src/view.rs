use serde::{Deserialize, Serialize};

use crate::auth::OtpState;
use crate::countdown::Phase;
use crate::model::{AppState, Model};
use crate::overlay::{EmergencyOverlay, TriggerSource};
use crate::session::{Contact, EmergencyLogEntry, EmergencyStatus, Language, Role, UserProfile};
use crate::{AppError, ErrorSeverity, ToastKind, ToastMessage, PIN_LENGTH};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct UserFacingError {
    pub message: String,
    pub is_transient: bool,
    pub error_code: String,
}

impl From<&AppError> for UserFacingError {
    fn from(e: &AppError) -> Self {
        Self {
            message: e.user_facing_message(),
            is_transient: e.severity == ErrorSeverity::Transient,
            error_code: e.code().to_string(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ToastView {
    pub message: String,
    pub kind: ToastKind,
    pub duration_ms: u64,
}

impl From<&ToastMessage> for ToastView {
    fn from(t: &ToastMessage) -> Self {
        Self {
            message: t.message.clone(),
            kind: t.kind,
            duration_ms: t.duration_ms,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProfileView {
    pub name: String,
    pub phone: String,
    pub age: u8,
    pub is_admin: bool,
}

impl From<&UserProfile> for ProfileView {
    fn from(u: &UserProfile) -> Self {
        Self {
            name: u.name.clone(),
            phone: u.phone.clone(),
            age: u.age,
            is_admin: u.role == Role::Admin,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContactView {
    pub id: String,
    pub name: String,
    pub phone: String,
}

impl From<&Contact> for ContactView {
    fn from(c: &Contact) -> Self {
        Self {
            id: c.id.0.clone(),
            name: c.name.clone(),
            phone: c.phone.clone(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContactsView {
    pub items: Vec<ContactView>,
    pub added: usize,
    pub max: usize,
    pub can_add: bool,
    pub can_continue: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct WatchView {
    pub connected: bool,
    pub heart_rate_text: String,
    pub motion_active: bool,
    pub mic_active: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct OverlayView {
    pub phase: Phase,
    pub trigger: TriggerSource,
    pub remaining_seconds: u32,
    pub progress: f32,
    /// One entry per PIN slot, `true` where a digit has been typed.
    pub pin_dots: Vec<bool>,
    pub keypad_enabled: bool,
}

impl From<&EmergencyOverlay> for OverlayView {
    fn from(o: &EmergencyOverlay) -> Self {
        let session = o.session();
        let entered = session.entered_len();
        Self {
            phase: session.phase(),
            trigger: o.trigger(),
            remaining_seconds: session.remaining_seconds(),
            progress: session.progress(),
            pin_dots: (0..PIN_LENGTH).map(|i| i < entered).collect(),
            keypad_enabled: session.phase() == Phase::Counting,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogEntryView {
    pub id: String,
    pub date: String,
    pub time: String,
    pub location: String,
    pub station: String,
    pub status: EmergencyStatus,
}

impl From<&EmergencyLogEntry> for LogEntryView {
    fn from(e: &EmergencyLogEntry) -> Self {
        Self {
            id: e.id().to_string(),
            date: e.date().to_string(),
            time: e.time().to_string(),
            location: e.location().to_string(),
            station: e.station().to_string(),
            status: e.status(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ViewModel {
    pub state: AppState,
    pub user: Option<ProfileView>,
    pub otp: OtpState,
    pub contacts: ContactsView,
    pub watch: WatchView,
    pub panic_confirm_open: bool,
    pub overlay: Option<OverlayView>,
    pub emergency_logs: Vec<LogEntryView>,
    pub language: Language,
    pub error: Option<UserFacingError>,
    pub toast: Option<ToastView>,
}

impl From<&Model> for ViewModel {
    fn from(model: &Model) -> Self {
        let contacts = model.session.contacts();
        let max = model.config.max_contacts;
        let watch = model.session.watch();

        Self {
            state: model.state,
            user: model.session.user().map(ProfileView::from),
            otp: model.otp,
            contacts: ContactsView {
                items: contacts.iter().map(ContactView::from).collect(),
                added: contacts.len(),
                max,
                can_add: contacts.len() < max,
                can_continue: model.contacts_complete(),
            },
            watch: WatchView {
                connected: watch.connected,
                heart_rate_text: format!("{} bpm", watch.heart_rate_bpm),
                motion_active: watch.motion_active,
                mic_active: watch.mic_active,
            },
            panic_confirm_open: model.panic_confirm_open,
            overlay: model.overlay.as_ref().map(OverlayView::from),
            emergency_logs: model
                .session
                .emergency_logs()
                .map(LogEntryView::from)
                .collect(),
            language: model.session.language(),
            error: model.active_error.as_ref().map(UserFacingError::from),
            toast: model.active_toast.as_ref().map(ToastView::from),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::TimerIds;
    use crate::countdown::{CountdownConfig, Digit};
    use crate::overlay::OverlayTimings;

    #[test]
    fn test_default_view() {
        let view = ViewModel::from(&Model::default());
        assert_eq!(view.state, AppState::Unauthenticated);
        assert!(view.user.is_none());
        assert!(view.overlay.is_none());
        assert_eq!(view.contacts.max, 5);
        assert!(view.contacts.can_add);
        assert!(!view.contacts.can_continue);
        assert_eq!(view.watch.heart_rate_text, "72 bpm");
    }

    #[test]
    fn test_overlay_masks_pin() {
        let mut ids = TimerIds::default();
        let (mut overlay, _) = EmergencyOverlay::open(
            CountdownConfig::new(30, "1234").unwrap(),
            TriggerSource::PanicButton,
            OverlayTimings::default(),
            0,
            &mut ids,
        );
        overlay.press_digit(Digit::try_from(1u8).unwrap(), &mut ids);
        overlay.press_digit(Digit::try_from(2u8).unwrap(), &mut ids);

        let view = OverlayView::from(&overlay);
        assert_eq!(view.pin_dots, vec![true, true, false, false]);
        assert_eq!(view.remaining_seconds, 30);
        assert!(view.keypad_enabled);
        assert!(!format!("{view:?}").contains("12"));
    }

    #[test]
    fn test_profile_admin_flag_follows_role() {
        let mut profile = UserProfile {
            name: "Priya Sharma".into(),
            phone: "9876543210".into(),
            age: 28,
            gender: "female".into(),
            role: Role::default(),
        };
        assert_eq!(profile.role, Role::User);
        assert!(!ProfileView::from(&profile).is_admin);

        profile.role = Role::Admin;
        assert!(ProfileView::from(&profile).is_admin);
    }

    #[test]
    fn test_error_view_uses_user_facing_message() {
        let err = AppError::new(crate::ErrorKind::NotFound, "contact 42 missing");
        let view = UserFacingError::from(&err);
        assert_eq!(view.error_code, "NOT_FOUND");
        assert!(view.is_transient);
        assert_ne!(view.message, err.message);
    }
}
