//! Capabilities the core asks the shell to perform.
//!
//! We use Crux's built-in Render capability directly because it provides
//! all necessary functionality for triggering view updates. Time only passes
//! through [`Timer`], so the core stays deterministic under test.

mod timer;

pub use self::timer::{Timer, TimerId, TimerIds, TimerOperation, TimerOutput};
pub use crux_core::render::Render;

use crate::app::App;
use crate::event::Event;

#[derive(crux_core::macros::Effect)]
#[effect(app = "App")]
pub struct Capabilities {
    pub render: Render<Event>,
    pub timer: Timer<Event>,
}
