//! # rtt-codec
//!
//! Real-time text: a message is transmitted while it is being typed, as an
//! ordered stream of insert, erase and wait actions, and rebuilt on the
//! receiving side key press by key press.
//!
//! - **Encoder**: diffs successive snapshots of the local text box into
//!   actions and drains them into sequenced payloads
//! - **Decoder**: replays payloads per remote author, plays back embedded
//!   typing delays and freezes the reconstruction when a payload is lost
//! - **Session**: a conversation of committed lines plus in-progress text,
//!   with the settings and presets a chat front end exposes
//!
//! The codec is transport agnostic. Payloads encode to a small JSON element
//! that a chat protocol embeds next to the final message body.
//!
//! ## Feature Flags
//!
//! - `codec` (default): actions, diff, encoder, decoder, registry
//! - `session` (default): conversation layer and envelope
//! - `runtime` (default): tokio flush and playback loops
//!
//! ## Example Usage
//!
//! ```rust
//! use rtt_codec::prelude::*;
//!
//! let mut encoder = Encoder::with_settings(1000, false)?;
//! encoder.observe("hel", 3);
//! encoder.observe("help", 4);
//! let wire = RttElement::from(encoder.take_payload(false)).to_json()?;
//!
//! let mut decoder = Decoder::with_playback(false);
//! let payload: Payload = RttElement::from_json(&wire)?.into();
//! decoder.decode(&payload);
//!
//! assert_eq!(decoder.text(), "help");
//! assert!(decoder.in_sync());
//! # Ok::<(), rtt_codec::RttError>(())
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// Core module (always included)
pub mod core;

// Codec (feature-gated)
#[cfg(feature = "codec")]
#[cfg_attr(docsrs, doc(cfg(feature = "codec")))]
pub mod codec;

// Conversation layer (feature-gated)
#[cfg(feature = "session")]
#[cfg_attr(docsrs, doc(cfg(feature = "session")))]
pub mod session;

// Async drivers (feature-gated)
#[cfg(feature = "runtime")]
#[cfg_attr(docsrs, doc(cfg(feature = "runtime")))]
pub mod runtime;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::core::*;

    #[cfg(feature = "codec")]
    pub use crate::codec::*;

    #[cfg(feature = "session")]
    pub use crate::session::*;

    #[cfg(feature = "runtime")]
    pub use crate::runtime::*;
}

// Re-export commonly used items at crate root
pub use crate::core::{ConfigError, EditTarget, RttError, WireError};

#[cfg(feature = "codec")]
pub use crate::codec::{Action, Decoder, DecoderRegistry, Encoder, Payload, RttElement, SyncStatus};

#[cfg(feature = "session")]
pub use crate::session::{Conversation, Envelope, Preset, RttConfig};
