//! The emergency overlay: one countdown session plus the timers driving it.
//!
//! The overlay turns countdown transitions into timer commands for the shell
//! and into the two caller callbacks. Every scheduled firing is tracked by its
//! [`TimerId`]; a firing that does not match the currently armed handle is
//! stale and is dropped, so a terminal session can never tick again or deliver
//! a callback twice.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::capabilities::{TimerId, TimerIds, TimerOutput};
use crate::countdown::{CountdownConfig, CountdownSession, Digit, Phase, Transition};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerSource {
    PanicButton,
    WatchAlert,
}

impl TriggerSource {
    #[must_use]
    pub const fn location_label(self) -> &'static str {
        match self {
            Self::PanicButton => "Current Location",
            Self::WatchAlert => "Watch Location",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlayTimings {
    pub tick_interval: Duration,
    pub display_delay: Duration,
}

impl Default for OverlayTimings {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(crate::DEFAULT_TICK_INTERVAL_MS),
            display_delay: Duration::from_millis(crate::DEFAULT_DISPLAY_DELAY_MS),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerCommand {
    Start { id: TimerId, after: Duration },
    Clear { id: TimerId },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayCallback {
    /// Fired at the moment the countdown runs out.
    Expire { at_ms: u64 },
    /// Fired once the cancellation confirmation has been shown.
    Cancel,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayUpdate {
    pub transition: Transition,
    pub commands: Vec<TimerCommand>,
    pub callback: Option<OverlayCallback>,
    pub closed: bool,
}

impl OverlayUpdate {
    fn new(transition: Transition) -> Self {
        Self {
            transition,
            commands: Vec::new(),
            callback: None,
            closed: false,
        }
    }
}

#[derive(Debug)]
pub struct EmergencyOverlay {
    session: CountdownSession,
    trigger: TriggerSource,
    timings: OverlayTimings,
    tick_timer: Option<TimerId>,
    dismiss_timer: Option<TimerId>,
    closed: bool,
}

impl EmergencyOverlay {
    pub fn open(
        config: CountdownConfig,
        trigger: TriggerSource,
        timings: OverlayTimings,
        now_ms: u64,
        ids: &mut TimerIds,
    ) -> (Self, OverlayUpdate) {
        let mut overlay = Self {
            session: CountdownSession::start(config),
            trigger,
            timings,
            tick_timer: None,
            dismiss_timer: None,
            closed: false,
        };

        info!(
            trigger = ?trigger,
            seconds = overlay.session.duration_seconds(),
            "emergency countdown opened"
        );

        let mut update;
        if overlay.session.phase() == Phase::Expired {
            update = OverlayUpdate::new(Transition::Expired);
            overlay.enter_expired(now_ms, ids, &mut update);
        } else {
            update = OverlayUpdate::new(Transition::Ignored);
            overlay.arm_tick(ids, &mut update);
        }
        (overlay, update)
    }

    pub fn press_digit(&mut self, digit: Digit, ids: &mut TimerIds) -> OverlayUpdate {
        let transition = self.session.submit_digit(digit);
        let mut update = OverlayUpdate::new(transition);

        match transition {
            Transition::Cancelled => {
                info!(trigger = ?self.trigger, "emergency countdown cancelled by PIN");
                self.disarm_tick(&mut update);
                self.arm_dismiss(ids, &mut update);
            }
            Transition::PinRejected => debug!("PIN rejected, entry cleared"),
            _ => {}
        }
        update
    }

    pub fn press_delete(&mut self) -> OverlayUpdate {
        OverlayUpdate::new(self.session.delete_digit())
    }

    pub fn timer_fired(
        &mut self,
        id: TimerId,
        output: &TimerOutput,
        ids: &mut TimerIds,
    ) -> OverlayUpdate {
        let mut update = OverlayUpdate::new(Transition::Ignored);

        if self.tick_timer == Some(id) {
            self.tick_timer = None;
            // Dropped by the shell while still armed: re-arm, count nothing.
            let TimerOutput::Fired { now_ms } = *output else {
                warn!(%id, "armed tick timer reported cleared, re-arming");
                self.arm_tick(ids, &mut update);
                return update;
            };

            update.transition = self.session.tick();
            match update.transition {
                Transition::Ticked { .. } => self.arm_tick(ids, &mut update),
                Transition::Expired => self.enter_expired(now_ms, ids, &mut update),
                _ => {}
            }
        } else if self.dismiss_timer == Some(id) {
            self.dismiss_timer = None;
            self.closed = true;
            update.closed = true;
            if self.session.phase() == Phase::Cancelled {
                update.callback = Some(OverlayCallback::Cancel);
            }
            debug!(%id, phase = ?self.session.phase(), "emergency overlay dismissed");
        } else {
            warn!(%id, "ignoring stale timer firing");
        }
        update
    }

    /// Tears the overlay down early, clearing whatever is still scheduled.
    pub fn close(&mut self) -> Vec<TimerCommand> {
        self.closed = true;
        [self.tick_timer.take(), self.dismiss_timer.take()]
            .into_iter()
            .flatten()
            .map(|id| TimerCommand::Clear { id })
            .collect()
    }

    fn enter_expired(&mut self, now_ms: u64, ids: &mut TimerIds, update: &mut OverlayUpdate) {
        info!(trigger = ?self.trigger, "emergency countdown expired, sending SOS");
        self.disarm_tick(update);
        update.callback = Some(OverlayCallback::Expire { at_ms: now_ms });
        self.arm_dismiss(ids, update);
    }

    fn arm_tick(&mut self, ids: &mut TimerIds, update: &mut OverlayUpdate) {
        let id = ids.allocate();
        self.tick_timer = Some(id);
        update.commands.push(TimerCommand::Start {
            id,
            after: self.timings.tick_interval,
        });
    }

    fn disarm_tick(&mut self, update: &mut OverlayUpdate) {
        if let Some(id) = self.tick_timer.take() {
            update.commands.push(TimerCommand::Clear { id });
        }
    }

    fn arm_dismiss(&mut self, ids: &mut TimerIds, update: &mut OverlayUpdate) {
        let id = ids.allocate();
        self.dismiss_timer = Some(id);
        update.commands.push(TimerCommand::Start {
            id,
            after: self.timings.display_delay,
        });
    }

    #[must_use]
    pub const fn session(&self) -> &CountdownSession {
        &self.session
    }

    #[must_use]
    pub const fn trigger(&self) -> TriggerSource {
        self.trigger
    }

    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.closed
    }

    #[must_use]
    pub const fn pending_tick(&self) -> Option<TimerId> {
        self.tick_timer
    }

    #[must_use]
    pub const fn pending_dismiss(&self) -> Option<TimerId> {
        self.dismiss_timer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIRED: TimerOutput = TimerOutput::Fired { now_ms: 1_000 };

    fn open(duration: i64) -> (EmergencyOverlay, OverlayUpdate, TimerIds) {
        let mut ids = TimerIds::default();
        let config = CountdownConfig::new(duration, "1234").unwrap();
        let (overlay, update) = EmergencyOverlay::open(
            config,
            TriggerSource::WatchAlert,
            OverlayTimings::default(),
            500,
            &mut ids,
        );
        (overlay, update, ids)
    }

    fn started(update: &OverlayUpdate) -> Vec<TimerId> {
        update
            .commands
            .iter()
            .filter_map(|c| match c {
                TimerCommand::Start { id, .. } => Some(*id),
                TimerCommand::Clear { .. } => None,
            })
            .collect()
    }

    fn enter_pin(overlay: &mut EmergencyOverlay, ids: &mut TimerIds, pin: [u8; 4]) -> OverlayUpdate {
        let mut last = None;
        for d in pin {
            last = Some(overlay.press_digit(Digit::try_from(d).unwrap(), ids));
        }
        last.unwrap()
    }

    #[test]
    fn test_open_arms_one_second_tick() {
        let (overlay, update, _) = open(30);
        assert_eq!(update.commands.len(), 1);
        assert!(matches!(
            update.commands[0],
            TimerCommand::Start { after, .. } if after == Duration::from_secs(1)
        ));
        assert_eq!(overlay.pending_tick(), Some(started(&update)[0]));
        assert!(update.callback.is_none());
    }

    #[test]
    fn test_zero_duration_expires_on_open() {
        let (overlay, update, _) = open(0);
        assert_eq!(update.transition, Transition::Expired);
        assert_eq!(update.callback, Some(OverlayCallback::Expire { at_ms: 500 }));
        assert!(overlay.pending_tick().is_none());
        assert!(overlay.pending_dismiss().is_some());
        assert_eq!(overlay.session().ticks_processed(), 0);
    }

    #[test]
    fn test_full_countdown_expires_once_then_closes() {
        let (mut overlay, update, mut ids) = open(30);
        let mut tick = started(&update)[0];
        let mut expirations = 0;

        for _ in 0..30 {
            let update = overlay.timer_fired(tick, &FIRED, &mut ids);
            if matches!(update.callback, Some(OverlayCallback::Expire { .. })) {
                expirations += 1;
            }
            if let Some(next) = started(&update).first() {
                tick = *next;
            }
        }

        assert_eq!(expirations, 1);
        assert_eq!(overlay.session().phase(), Phase::Expired);
        assert!(overlay.pending_tick().is_none());

        let dismiss = overlay.pending_dismiss().unwrap();
        assert_eq!(tick, dismiss);
        let update = overlay.timer_fired(dismiss, &FIRED, &mut ids);
        assert!(update.closed);
        assert!(update.callback.is_none());
        assert!(overlay.is_closed());
    }

    #[test]
    fn test_cancel_clears_pending_tick_and_ignores_late_firing() {
        let (mut overlay, update, mut ids) = open(30);
        let tick = started(&update)[0];

        let update = enter_pin(&mut overlay, &mut ids, [1, 2, 3, 4]);
        assert_eq!(update.transition, Transition::Cancelled);
        assert!(update.commands.contains(&TimerCommand::Clear { id: tick }));
        assert!(update.callback.is_none());
        assert!(overlay.pending_tick().is_none());

        let late = overlay.timer_fired(tick, &FIRED, &mut ids);
        assert_eq!(late.transition, Transition::Ignored);
        assert!(late.commands.is_empty());
        assert_eq!(overlay.session().remaining_seconds(), 30);

        let dismiss = overlay.pending_dismiss().unwrap();
        let first = overlay.timer_fired(dismiss, &FIRED, &mut ids);
        assert_eq!(first.callback, Some(OverlayCallback::Cancel));
        assert!(first.closed);

        let second = overlay.timer_fired(dismiss, &FIRED, &mut ids);
        assert!(second.callback.is_none());
    }

    #[test]
    fn test_wrong_pin_keeps_tick_armed() {
        let (mut overlay, update, mut ids) = open(30);
        let tick = started(&update)[0];

        let update = enter_pin(&mut overlay, &mut ids, [1, 2, 9, 4]);
        assert_eq!(update.transition, Transition::PinRejected);
        assert!(update.commands.is_empty());
        assert_eq!(overlay.pending_tick(), Some(tick));
        assert_eq!(overlay.session().remaining_seconds(), 30);
    }

    #[test]
    fn test_cleared_tick_is_rearmed() {
        let (mut overlay, update, mut ids) = open(30);
        let tick = started(&update)[0];

        let update = overlay.timer_fired(tick, &TimerOutput::Cleared, &mut ids);
        assert_eq!(update.transition, Transition::Ignored);
        assert_eq!(overlay.session().remaining_seconds(), 30);
        assert_eq!(overlay.session().phase(), Phase::Counting);

        let rearmed = started(&update);
        assert_eq!(rearmed.len(), 1);
        assert_ne!(rearmed[0], tick);
        assert_eq!(overlay.pending_tick(), Some(rearmed[0]));

        // The replacement tick drives the countdown on as usual.
        let update = overlay.timer_fired(rearmed[0], &FIRED, &mut ids);
        assert_eq!(update.transition, Transition::Ticked { remaining_seconds: 29 });

        // The original handle is stale now.
        let late = overlay.timer_fired(tick, &FIRED, &mut ids);
        assert_eq!(late.transition, Transition::Ignored);
        assert_eq!(overlay.session().remaining_seconds(), 29);
    }

    #[test]
    fn test_cleared_dismiss_still_closes() {
        let (mut overlay, _, mut ids) = open(0);
        let dismiss = overlay.pending_dismiss().unwrap();
        let update = overlay.timer_fired(dismiss, &TimerOutput::Cleared, &mut ids);
        assert!(update.closed);
        assert!(update.commands.is_empty());
    }

    #[test]
    fn test_close_clears_everything_pending() {
        let (mut overlay, update, _) = open(30);
        let tick = started(&update)[0];
        assert_eq!(overlay.close(), vec![TimerCommand::Clear { id: tick }]);
        assert!(overlay.close().is_empty());
        assert!(overlay.is_closed());
    }

    #[test]
    fn test_trigger_labels() {
        assert_eq!(TriggerSource::PanicButton.location_label(), "Current Location");
        assert_eq!(TriggerSource::WatchAlert.location_label(), "Watch Location");
    }
}
