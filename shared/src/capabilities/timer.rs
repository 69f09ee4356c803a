use crux_core::capability::{Capability, CapabilityContext, Operation};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Handle for one scheduled firing. The core never reuses an id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimerId(pub u64);

impl std::fmt::Display for TimerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "timer-{}", self.0)
    }
}

/// Monotonic source of [`TimerId`]s.
#[derive(Debug, Default)]
pub struct TimerIds {
    next: u64,
}

impl TimerIds {
    pub fn allocate(&mut self) -> TimerId {
        self.next += 1;
        TimerId(self.next)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimerOperation {
    /// One-shot timer. The shell resolves it once, after `millis`.
    Start { id: TimerId, millis: u64 },
    /// Drop a pending timer. The shell may still resolve the matching start
    /// with [`TimerOutput::Cleared`].
    Clear { id: TimerId },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerOutput {
    Fired { now_ms: u64 },
    Cleared,
}

impl Operation for TimerOperation {
    type Output = TimerOutput;
}

pub struct Timer<Ev> {
    context: CapabilityContext<TimerOperation, Ev>,
}

impl<Ev> Capability<Ev> for Timer<Ev> {
    type Operation = TimerOperation;
    type MappedSelf<MappedEv> = Timer<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + 'static,
        Ev: 'static,
        NewEv: 'static + Send,
    {
        Timer::new(self.context.map_event(f))
    }
}

impl<Ev> Timer<Ev>
where
    Ev: 'static,
{
    pub fn new(context: CapabilityContext<TimerOperation, Ev>) -> Self {
        Self { context }
    }

    pub fn start<F>(&self, id: TimerId, after: Duration, callback: F)
    where
        F: FnOnce(TimerOutput) -> Ev + Send + 'static,
    {
        let millis = u64::try_from(after.as_millis()).unwrap_or(u64::MAX);
        let context = self.context.clone();
        self.context.spawn(async move {
            let output = context
                .request_from_shell(TimerOperation::Start { id, millis })
                .await;
            context.update_app(callback(output));
        });
    }

    pub fn clear(&self, id: TimerId) {
        let context = self.context.clone();
        self.context.spawn(async move {
            context.notify_shell(TimerOperation::Clear { id }).await;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_monotonic() {
        let mut ids = TimerIds::default();
        let a = ids.allocate();
        let b = ids.allocate();
        assert!(b > a);
        assert_ne!(a, b);
    }

    #[test]
    fn test_operation_wire_format() {
        let op = TimerOperation::Start {
            id: TimerId(3),
            millis: 1000,
        };
        let json = serde_json::to_value(&op).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "Start": { "id": 3, "millis": 1000 } })
        );
    }

    #[test]
    fn test_output_from_shell() {
        let fired: TimerOutput =
            serde_json::from_str(r#"{ "fired": { "now_ms": 42 } }"#).unwrap();
        assert_eq!(fired, TimerOutput::Fired { now_ms: 42 });

        let cleared: TimerOutput = serde_json::from_str(r#""cleared""#).unwrap();
        assert_eq!(cleared, TimerOutput::Cleared);
    }
}
