//! Message envelope
//!
//! What a chat transport carries between two parties: an optional `rtt`
//! element with in-progress edits, and an optional final `body` sent once
//! per committed message. Either or both may be present.

use serde::{Deserialize, Serialize};

use crate::codec::{Payload, RttElement};
use crate::core::WireError;

/// One transmitted message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Real-time text element.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rtt: Option<RttElement>,
    /// Final text of a committed message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl Envelope {
    /// In-progress update.
    pub fn update(payload: Payload) -> Self {
        Self {
            rtt: Some(payload.into()),
            body: None,
        }
    }

    /// Committed message with its last real-time payload.
    pub fn commit(payload: Option<Payload>, body: impl Into<String>) -> Self {
        Self {
            rtt: payload.map(Into::into),
            body: Some(body.into()),
        }
    }

    /// Whether this envelope commits a message.
    pub fn is_commit(&self) -> bool {
        self.body.is_some()
    }

    /// Decoded payload, if the envelope carries one.
    pub fn payload(&self) -> Option<Payload> {
        self.rtt.clone().map(Into::into)
    }

    /// Encode as JSON.
    pub fn to_json(&self) -> Result<String, WireError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode from JSON.
    pub fn from_json(data: &str) -> Result<Self, WireError> {
        Ok(serde_json::from_str(data)?)
    }
}
