//! Conversation layer
//!
//! Implements:
//! - User settings and named presets
//! - The envelope a chat transport carries (`rtt` element + final `body`)
//! - A conversation: committed lines, the local encoder and one decoder per
//!   remote author

mod config;
mod conversation;
mod envelope;

pub use config::*;
pub use conversation::*;
pub use envelope::*;
