//! Real-time text codec
//!
//! Implements:
//! - Edit actions (insert / erase / wait) and their wire shape
//! - A linear prefix/suffix diff between buffer snapshots
//! - The encoder queue with sequence and message numbering
//! - Flush pacing
//! - Per-author decoders with gap detection and delay playback

mod action;
mod decoder;
mod diff;
mod encoder;
mod pacing;
mod payload;
mod registry;

pub use action::*;
pub use decoder::*;
pub use diff::*;
pub use encoder::*;
pub use pacing::*;
pub use payload::*;
pub use registry::*;
