use tracing::{debug, info, warn};

use crate::capabilities::Capabilities;
use crate::countdown::Digit;
use crate::event::Event;
use crate::model::{AppState, Model};
use crate::overlay::{EmergencyOverlay, OverlayCallback, OverlayUpdate, TimerCommand, TriggerSource};
use crate::session::{sample_history, EmergencyLogEntry, EmergencyStatus, NEAREST_STATION_LABEL};
use crate::view::ViewModel;
use crate::{AppError, ErrorKind, ToastKind};

#[derive(Default)]
pub struct App;

impl App {
    fn open_emergency(
        model: &mut Model,
        caps: &Capabilities,
        trigger: TriggerSource,
        now_ms: u64,
    ) {
        if !model.session.is_authenticated() {
            model.set_error(AppError::new(
                ErrorKind::Authentication,
                "Sign in to use emergency alerts",
            ));
            return;
        }
        if model.overlay.is_some() {
            warn!(trigger = ?trigger, "emergency already in progress, ignoring trigger");
            return;
        }

        let config = match model.config.countdown(model.session.pin()) {
            Ok(config) => config,
            Err(e) => {
                warn!(error = %e, "cannot start emergency countdown");
                model.set_error(e);
                return;
            }
        };

        let (overlay, update) = EmergencyOverlay::open(
            config,
            trigger,
            model.config.timings(),
            now_ms,
            &mut model.timer_ids,
        );
        model.overlay = Some(overlay);
        Self::apply_overlay_update(model, caps, update);
    }

    fn apply_overlay_update(model: &mut Model, caps: &Capabilities, update: OverlayUpdate) {
        for command in update.commands {
            match command {
                TimerCommand::Start { id, after } => {
                    caps.timer
                        .start(id, after, move |output| Event::TimerFired { id, output });
                }
                TimerCommand::Clear { id } => caps.timer.clear(id),
            }
        }

        let trigger = model.overlay.as_ref().map(EmergencyOverlay::trigger);

        match update.callback {
            Some(OverlayCallback::Expire { at_ms }) => {
                let location = trigger.map_or("Unknown Location", TriggerSource::location_label);
                model.session.add_emergency_log(EmergencyLogEntry::at(
                    at_ms,
                    model.config.utc_offset_minutes,
                    location,
                    NEAREST_STATION_LABEL,
                    EmergencyStatus::Sent,
                ));
                model.show_toast("SOS sent to your contacts and the nearest station", ToastKind::Error);
            }
            Some(OverlayCallback::Cancel) => {
                model.show_toast("Emergency cancelled", ToastKind::Success);
            }
            None => {}
        }

        if update.closed {
            model.overlay = None;
        }
    }

    fn close_emergency(model: &mut Model, caps: &Capabilities) {
        if let Some(mut overlay) = model.overlay.take() {
            info!(trigger = ?overlay.trigger(), "emergency overlay closed early");
            for command in overlay.close() {
                if let TimerCommand::Clear { id } = command {
                    caps.timer.clear(id);
                }
            }
        }
    }

    fn require_signed_in(model: &mut Model) -> bool {
        if model.session.is_authenticated() {
            true
        } else {
            model.set_error(AppError::new(ErrorKind::Authentication, "Please sign in"));
            false
        }
    }
}

impl crux_core::App for App {
    type Event = Event;
    type Model = Model;
    type ViewModel = ViewModel;
    type Capabilities = Capabilities;

    fn update(&self, event: Event, model: &mut Model, caps: &Capabilities) {
        debug!(
            event = event.name(),
            user_initiated = event.is_user_initiated(),
            "handling event"
        );

        match event {
            Event::Noop => return,

            Event::Configure(config) => match config.validate() {
                Ok(()) => {
                    if config.sample_history && model.session.emergency_log_count() == 0 {
                        for entry in sample_history().into_iter().rev() {
                            model.session.add_emergency_log(entry);
                        }
                    }
                    info!(countdown_seconds = config.countdown_seconds, "configuration applied");
                    model.config = config;
                }
                Err(e) => {
                    warn!(error = %e, "rejecting configuration");
                    model.set_error(e);
                }
            },

            Event::SendOtp { phone } => match model.otp.send(&phone) {
                Ok(()) => model.show_toast("OTP sent!", ToastKind::Success),
                Err(e) => model.set_error(e),
            },

            Event::VerifyOtp { code } => match model.otp.verify(&code) {
                Ok(()) => model.show_toast("OTP verified!", ToastKind::Success),
                Err(e) => model.set_error(e),
            },

            Event::RegisterRequested(form) => match form.validate(model.otp) {
                Ok((profile, pin)) => {
                    model.session.login(profile, Some(pin));
                    model.otp = crate::auth::OtpState::default();
                    model.state = AppState::ContactsSetup;
                    model.clear_error();
                    model.show_toast("Registration successful!", ToastKind::Success);
                }
                Err(e) => model.set_error(e),
            },

            Event::LoginRequested(form) => match form.accept() {
                Ok(profile) => {
                    model.session.login(profile, None);
                    model.state = if model.contacts_complete() {
                        AppState::Ready
                    } else {
                        AppState::ContactsSetup
                    };
                    model.clear_error();
                    model.show_toast("Login successful!", ToastKind::Success);
                }
                Err(e) => model.set_error(e),
            },

            Event::LogoutRequested => {
                Self::close_emergency(model, caps);
                model.session.logout();
                model.otp = crate::auth::OtpState::default();
                model.panic_confirm_open = false;
                model.state = AppState::Unauthenticated;
            }

            Event::AddContact { name, phone } => {
                if Self::require_signed_in(model) {
                    let max = model.config.max_contacts;
                    match model.session.add_contact(&name, &phone, max) {
                        Ok(contact) => {
                            let message = format!("{} added!", contact.name);
                            model.show_toast(message, ToastKind::Success);
                        }
                        Err(e) => model.set_error(e),
                    }
                }
            }

            Event::RemoveContact { id } => {
                if Self::require_signed_in(model) {
                    if let Err(e) = model.session.remove_contact(&id) {
                        model.set_error(e);
                    }
                }
            }

            Event::ContinueToDashboard => {
                if model.contacts_complete() {
                    model.state = AppState::Ready;
                } else {
                    let missing = model
                        .config
                        .max_contacts
                        .saturating_sub(model.session.contacts().len());
                    model.set_error(AppError::new(
                        ErrorKind::Validation,
                        format!("Add {missing} more trusted contacts to continue"),
                    ));
                }
            }

            Event::WatchConnectionChanged { connected } => {
                info!(connected, "watch connection changed");
                model.session.set_watch_connected(connected);
            }

            Event::VitalsReported {
                heart_rate_bpm,
                motion_active,
                mic_active,
            } => {
                model
                    .session
                    .report_vitals(heart_rate_bpm, motion_active, mic_active);
            }

            Event::PanicPressed => {
                if model.overlay.is_none() && Self::require_signed_in(model) {
                    model.panic_confirm_open = true;
                }
            }

            Event::PanicDismissed => model.panic_confirm_open = false,

            Event::PanicConfirmed { now_ms } => {
                if model.panic_confirm_open {
                    model.panic_confirm_open = false;
                    Self::open_emergency(model, caps, TriggerSource::PanicButton, now_ms);
                } else {
                    warn!("panic confirmed without an open dialog, ignoring");
                }
            }

            Event::WatchAlertReceived { now_ms } => {
                Self::open_emergency(model, caps, TriggerSource::WatchAlert, now_ms);
            }

            Event::PinDigitPressed { digit } => {
                let digit = match Digit::try_from(digit) {
                    Ok(digit) => digit,
                    Err(e) => {
                        warn!(error = %e, "ignoring keypad input");
                        return;
                    }
                };
                if let Some(overlay) = model.overlay.as_mut() {
                    let update = overlay.press_digit(digit, &mut model.timer_ids);
                    Self::apply_overlay_update(model, caps, update);
                }
            }

            Event::PinDeletePressed => {
                if let Some(overlay) = model.overlay.as_mut() {
                    let update = overlay.press_delete();
                    Self::apply_overlay_update(model, caps, update);
                }
            }

            Event::TimerFired { id, output } => match model.overlay.as_mut() {
                Some(overlay) => {
                    let update = overlay.timer_fired(id, &output, &mut model.timer_ids);
                    Self::apply_overlay_update(model, caps, update);
                }
                None => debug!(%id, "timer fired with no emergency open"),
            },

            Event::LiveTrackingRequested => {
                model.show_toast("Live tracking enabled!", ToastKind::Success);
            }

            Event::CheckInRequested => {
                model.show_toast("Check-in timer started!", ToastKind::Success);
            }

            Event::LanguageSelected { language } => model.session.set_language(language),

            Event::DismissError => model.clear_error(),

            Event::DismissToast => model.clear_toast(),
        }

        caps.render.render();
    }

    fn view(&self, model: &Model) -> ViewModel {
        ViewModel::from(model)
    }
}
