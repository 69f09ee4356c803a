use serde::{Deserialize, Serialize};

use crate::auth::{LoginForm, RegistrationForm};
use crate::capabilities::{TimerId, TimerOutput};
use crate::config::SafetyConfig;
use crate::session::Language;
use crate::ContactId;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum Event {
    #[default]
    Noop,

    Configure(SafetyConfig),

    SendOtp {
        phone: String,
    },
    VerifyOtp {
        code: String,
    },
    RegisterRequested(Box<RegistrationForm>),
    LoginRequested(LoginForm),
    LogoutRequested,

    AddContact {
        name: String,
        phone: String,
    },
    RemoveContact {
        id: ContactId,
    },
    ContinueToDashboard,

    WatchConnectionChanged {
        connected: bool,
    },
    VitalsReported {
        heart_rate_bpm: u16,
        motion_active: bool,
        mic_active: bool,
    },

    PanicPressed,
    PanicDismissed,
    PanicConfirmed {
        now_ms: u64,
    },
    WatchAlertReceived {
        now_ms: u64,
    },
    PinDigitPressed {
        digit: u8,
    },
    PinDeletePressed,

    LiveTrackingRequested,
    CheckInRequested,
    LanguageSelected {
        language: Language,
    },
    DismissError,
    DismissToast,

    // Resolved by the shell; not sent directly.
    #[serde(skip)]
    TimerFired {
        id: TimerId,
        output: TimerOutput,
    },
}

impl Event {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Noop => "noop",
            Self::Configure(_) => "configure",
            Self::SendOtp { .. } => "send_otp",
            Self::VerifyOtp { .. } => "verify_otp",
            Self::RegisterRequested(_) => "register_requested",
            Self::LoginRequested(_) => "login_requested",
            Self::LogoutRequested => "logout_requested",
            Self::AddContact { .. } => "add_contact",
            Self::RemoveContact { .. } => "remove_contact",
            Self::ContinueToDashboard => "continue_to_dashboard",
            Self::WatchConnectionChanged { .. } => "watch_connection_changed",
            Self::VitalsReported { .. } => "vitals_reported",
            Self::PanicPressed => "panic_pressed",
            Self::PanicDismissed => "panic_dismissed",
            Self::PanicConfirmed { .. } => "panic_confirmed",
            Self::WatchAlertReceived { .. } => "watch_alert_received",
            Self::PinDigitPressed { .. } => "pin_digit_pressed",
            Self::PinDeletePressed => "pin_delete_pressed",
            Self::LiveTrackingRequested => "live_tracking_requested",
            Self::CheckInRequested => "check_in_requested",
            Self::LanguageSelected { .. } => "language_selected",
            Self::DismissError => "dismiss_error",
            Self::DismissToast => "dismiss_toast",
            Self::TimerFired { .. } => "timer_fired",
        }
    }

    #[must_use]
    pub const fn is_user_initiated(&self) -> bool {
        !matches!(
            self,
            Self::Noop
                | Self::Configure(_)
                | Self::WatchConnectionChanged { .. }
                | Self::VitalsReported { .. }
                | Self::WatchAlertReceived { .. }
                | Self::TimerFired { .. }
        )
    }
}
