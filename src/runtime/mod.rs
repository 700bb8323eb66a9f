//! Async drivers
//!
//! Tokio tasks that supply the timers the codec itself never starts:
//! - a flush loop draining the encoder at the configured interval
//! - a playback loop releasing delayed remote actions
//! - an in-memory link that can lose updates, for tests and demos

mod driver;
mod link;

pub use driver::*;
pub use link::*;
