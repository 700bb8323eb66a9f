//! Payload and wire element types
//!
//! A [`Payload`] is the decoded form the encoder produces and the decoder
//! consumes. An [`RttElement`] is its wire shape:
//!
//! ```text
//! {
//!   "seq": 7,                  // payload sequence (wrapping u32)
//!   "msg": 2,                  // message number, omitted when 0
//!   "event": "reset",          // omitted for "edit"
//!   "actions": [
//!     { "op": "insert", "pos": 0, "text": "hi" },
//!     { "op": "wait", "ms": 140 },
//!     { "op": "erase", "pos": 1, "count": 1 }
//!   ]
//! }
//! ```
//!
//! The element travels next to an optional final-text body on whatever
//! message envelope the transport defines.

use serde::{Deserialize, Serialize};

use super::action::Action;
use crate::core::WireError;

/// Payload event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadEvent {
    /// Discard the current reconstruction and start from empty.
    Reset,
    /// Continue editing the current reconstruction.
    #[default]
    Edit,
}

impl PayloadEvent {
    /// Check if this is the default `edit` event.
    pub fn is_edit(&self) -> bool {
        matches!(self, Self::Edit)
    }
}

/// An ordered batch of actions plus sequencing information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    /// Per-payload sequence number, used for gap detection.
    pub sequence: u32,
    /// Message number the payload belongs to.
    pub message: u32,
    /// Reset or edit.
    pub event: PayloadEvent,
    /// Actions, applied in order.
    pub actions: Vec<Action>,
}

impl Payload {
    /// Create an edit payload.
    pub fn edit(sequence: u32, message: u32, actions: Vec<Action>) -> Self {
        Self {
            sequence,
            message,
            event: PayloadEvent::Edit,
            actions,
        }
    }

    /// Create a reset payload.
    pub fn reset(sequence: u32, message: u32, actions: Vec<Action>) -> Self {
        Self {
            sequence,
            message,
            event: PayloadEvent::Reset,
            actions,
        }
    }

    /// Check whether this is a reset payload.
    pub fn is_reset(&self) -> bool {
        self.event == PayloadEvent::Reset
    }

    /// Check whether the payload carries no actions.
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Number of text-editing (non-wait) actions.
    pub fn edit_count(&self) -> usize {
        self.actions.iter().filter(|a| a.is_edit()).count()
    }

    /// Convert to the wire element.
    pub fn to_element(&self) -> RttElement {
        RttElement::from(self.clone())
    }
}

/// Wire shape of a payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RttElement {
    /// Payload sequence.
    pub seq: u32,
    /// Message number.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub msg: u32,
    /// Event, `edit` when absent.
    #[serde(default, skip_serializing_if = "PayloadEvent::is_edit")]
    pub event: PayloadEvent,
    /// Actions.
    #[serde(default)]
    pub actions: Vec<Action>,
}

fn is_zero(n: &u32) -> bool {
    *n == 0
}

impl RttElement {
    /// Encode as JSON.
    pub fn to_json(&self) -> Result<String, WireError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode from JSON.
    pub fn from_json(data: &str) -> Result<Self, WireError> {
        Ok(serde_json::from_str(data)?)
    }
}

impl From<Payload> for RttElement {
    fn from(payload: Payload) -> Self {
        Self {
            seq: payload.sequence,
            msg: payload.message,
            event: payload.event,
            actions: payload.actions,
        }
    }
}

impl From<RttElement> for Payload {
    fn from(element: RttElement) -> Self {
        Self {
            sequence: element.seq,
            message: element.msg,
            event: element.event,
            actions: element.actions,
        }
    }
}
