//! Encoder
//!
//! Observes successive snapshots of the local buffer, queues the diff
//! between each pair and drains the queue into sequenced payloads. The
//! encoder never starts timers: the caller decides when to drain.

use std::time::Instant;

use tracing::debug;

use super::action::Action;
use super::diff::{Snapshot, diff};
use super::payload::{Payload, PayloadEvent};
use crate::core::{
    ConfigError, DEFAULT_EMBED_DELAYS, DEFAULT_FLUSH_INTERVAL_MS, MAX_WAIT_MS,
    is_allowed_flush_interval,
};

/// Local-side real-time text encoder.
///
/// One encoder exists per outgoing conversation. It owns:
/// - the last observed snapshot, which the next observation is diffed against
/// - the queue of actions not yet drained
/// - a per-payload sequence number (gap detection on the receiver)
/// - a per-message number, bumped on every commit
#[derive(Debug, Clone)]
pub struct Encoder {
    /// Last observed buffer state
    previous: Snapshot,
    /// Actions waiting to be drained
    pending: Vec<Action>,
    /// Number of the message being composed
    message_sequence: u32,
    /// Sequence the next non-empty payload will carry
    next_sequence: u32,
    /// Next payload starts a new message
    new_message: bool,
    /// When the last queued edit was observed
    last_edit_at: Option<Instant>,
    /// Flush cadence the caller is asked to honour
    flush_interval_ms: u32,
    /// Whether `Wait` actions are embedded between edits
    embed_delays: bool,
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Encoder {
    /// Create an encoder with the recommended settings.
    pub fn new() -> Self {
        Self {
            previous: Snapshot::empty(),
            pending: Vec::new(),
            message_sequence: 0,
            next_sequence: 1,
            new_message: true,
            last_edit_at: None,
            flush_interval_ms: DEFAULT_FLUSH_INTERVAL_MS,
            embed_delays: DEFAULT_EMBED_DELAYS,
        }
    }

    /// Create an encoder with explicit pacing settings.
    pub fn with_settings(flush_interval_ms: u32, embed_delays: bool) -> Result<Self, ConfigError> {
        let mut encoder = Self::new();
        encoder.set_flush_interval_ms(flush_interval_ms)?;
        encoder.embed_delays = embed_delays;
        Ok(encoder)
    }

    /// Observe the current buffer state.
    ///
    /// Returns the number of actions queued.
    pub fn observe(&mut self, text: &str, cursor: usize) -> usize {
        self.observe_at(text, cursor, Instant::now())
    }

    /// Observe the current buffer state at a given instant.
    pub fn observe_at(&mut self, text: &str, cursor: usize, now: Instant) -> usize {
        let current = Snapshot::new(text, cursor);
        let actions = diff(&self.previous, &current);
        if actions.is_empty() {
            self.previous.cursor = cursor;
            return 0;
        }

        let mut queued = actions.len();
        if self.embed_delays
            && !self.pending.is_empty()
            && let Some(last) = self.last_edit_at
        {
            let elapsed = now.saturating_duration_since(last).as_millis();
            let ms = elapsed.min(MAX_WAIT_MS as u128) as u32;
            if ms > 0 {
                self.pending.push(Action::wait(ms));
                queued += 1;
            }
        }

        self.pending.extend(actions);
        self.previous = current;
        self.last_edit_at = Some(now);
        queued
    }

    /// Check whether actions are waiting to be drained.
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Actions waiting to be drained.
    pub fn pending(&self) -> &[Action] {
        &self.pending
    }

    /// Drain queued actions into a payload.
    ///
    /// With nothing pending and `for_commit == false` the returned payload is
    /// empty and consumes no sequence number; it must not be transmitted.
    /// A commit always yields a transmittable payload, bumps the message
    /// number and makes the next observation diff against an empty buffer.
    pub fn take_payload(&mut self, for_commit: bool) -> Payload {
        if self.pending.is_empty() && !for_commit {
            return Payload::edit(self.next_sequence, self.message_sequence, Vec::new());
        }

        let event = if self.new_message {
            PayloadEvent::Reset
        } else {
            PayloadEvent::Edit
        };
        let payload = Payload {
            sequence: self.next_sequence,
            message: self.message_sequence,
            event,
            actions: std::mem::take(&mut self.pending),
        };
        debug!(
            seq = payload.sequence,
            msg = payload.message,
            ?event,
            actions = payload.actions.len(),
            commit = for_commit,
            "drained rtt payload"
        );

        self.next_sequence = self.next_sequence.wrapping_add(1);
        self.new_message = false;
        self.last_edit_at = None;

        if for_commit {
            self.message_sequence = self.message_sequence.wrapping_add(1);
            self.previous = Snapshot::empty();
            self.new_message = true;
        }

        payload
    }

    /// Discard the in-progress message without sending it.
    ///
    /// The message number is kept; the next payload is a reset.
    pub fn reset(&mut self) {
        self.pending.clear();
        self.previous = Snapshot::empty();
        self.last_edit_at = None;
        self.new_message = true;
    }

    /// Last observed snapshot.
    pub fn snapshot(&self) -> &Snapshot {
        &self.previous
    }

    /// Number of the message being composed.
    pub fn message_sequence(&self) -> u32 {
        self.message_sequence
    }

    /// Sequence the next transmitted payload will carry.
    pub fn payload_sequence(&self) -> u32 {
        self.next_sequence
    }

    /// Flush interval in milliseconds.
    pub fn flush_interval_ms(&self) -> u32 {
        self.flush_interval_ms
    }

    /// Change the flush interval. Already queued actions are unaffected.
    pub fn set_flush_interval_ms(&mut self, ms: u32) -> Result<(), ConfigError> {
        if !is_allowed_flush_interval(ms) {
            return Err(ConfigError::UnsupportedFlushInterval(ms));
        }
        self.flush_interval_ms = ms;
        Ok(())
    }

    /// Whether `Wait` actions are embedded.
    pub fn embed_delays(&self) -> bool {
        self.embed_delays
    }

    /// Toggle `Wait` embedding. Already queued actions are unaffected.
    pub fn set_embed_delays(&mut self, embed: bool) {
        self.embed_delays = embed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn quiet_encoder() -> Encoder {
        Encoder::with_settings(1000, false).unwrap()
    }

    #[test]
    fn test_incremental_typing_is_not_collapsed() {
        let mut encoder = quiet_encoder();
        encoder.observe("h", 1);
        encoder.observe("he", 2);
        encoder.observe("hel", 3);

        let payload = encoder.take_payload(false);
        assert_eq!(
            payload.actions,
            vec![Action::insert(0, "h"), Action::insert(1, "e"), Action::insert(2, "l")]
        );
        assert!(payload.is_reset());
        assert!(!encoder.has_pending());
    }

    #[test]
    fn test_noop_observe_queues_nothing() {
        let mut encoder = quiet_encoder();
        assert_eq!(encoder.observe("abc", 3), 1);
        assert_eq!(encoder.observe("abc", 3), 0);
        assert_eq!(encoder.observe("abc", 1), 0);

        assert_eq!(encoder.pending().len(), 1);
        assert_eq!(encoder.snapshot().cursor, 1);
    }

    #[test]
    fn test_commit_diffs_against_empty() {
        let mut encoder = quiet_encoder();
        encoder.observe("hello", 5);
        let committed = encoder.take_payload(true);
        assert_eq!(committed.message, 0);
        assert_eq!(encoder.message_sequence(), 1);

        encoder.observe("x", 1);
        let next = encoder.take_payload(false);
        assert_eq!(next.actions, vec![Action::insert(0, "x")]);
        assert!(next.is_reset());
        assert_eq!(next.message, 1);
    }

    #[test]
    fn test_sequences_advance_per_payload() {
        let mut encoder = quiet_encoder();
        encoder.observe("a", 1);
        let first = encoder.take_payload(false);
        encoder.observe("ab", 2);
        let second = encoder.take_payload(false);

        assert_eq!(first.sequence, 1);
        assert_eq!(second.sequence, 2);
        assert!(first.is_reset());
        assert!(!second.is_reset());
        assert_eq!(first.message, second.message);
    }

    #[test]
    fn test_empty_flush_consumes_nothing() {
        let mut encoder = quiet_encoder();
        let empty = encoder.take_payload(false);
        assert!(empty.is_empty());
        assert_eq!(encoder.payload_sequence(), 1);

        encoder.observe("a", 1);
        let payload = encoder.take_payload(false);
        assert_eq!(payload.sequence, 1);
        assert!(payload.is_reset());
    }

    #[test]
    fn test_empty_commit_is_transmittable() {
        let mut encoder = quiet_encoder();
        let payload = encoder.take_payload(true);
        assert!(payload.is_empty());
        assert_eq!(payload.sequence, 1);
        assert_eq!(encoder.payload_sequence(), 2);
        assert_eq!(encoder.message_sequence(), 1);
    }

    #[test]
    fn test_reset_keeps_message_number() {
        let mut encoder = quiet_encoder();
        encoder.observe("draft", 5);
        encoder.take_payload(false);
        encoder.observe("drafts", 6);

        encoder.reset();
        assert!(!encoder.has_pending());
        assert!(encoder.snapshot().is_empty());
        assert_eq!(encoder.message_sequence(), 0);

        encoder.observe("new", 3);
        let payload = encoder.take_payload(false);
        assert!(payload.is_reset());
        assert_eq!(payload.actions, vec![Action::insert(0, "new")]);
    }

    #[test]
    fn test_embedded_waits_between_edits() {
        let mut encoder = Encoder::new();
        let t0 = Instant::now();
        encoder.observe_at("h", 1, t0);
        encoder.observe_at("h", 1, t0 + Duration::from_millis(50));
        encoder.observe_at("hi", 2, t0 + Duration::from_millis(120));

        let payload = encoder.take_payload(false);
        assert_eq!(
            payload.actions,
            vec![Action::insert(0, "h"), Action::wait(120), Action::insert(1, "i")]
        );

        // First edit of a new batch carries no leading wait
        encoder.observe_at("hi!", 3, t0 + Duration::from_millis(900));
        let payload = encoder.take_payload(false);
        assert_eq!(payload.actions, vec![Action::insert(2, "!")]);
    }

    #[test]
    fn test_wait_is_capped() {
        let mut encoder = Encoder::new();
        let t0 = Instant::now();
        encoder.observe_at("a", 1, t0);
        encoder.observe_at("ab", 2, t0 + Duration::from_secs(60));

        assert_eq!(encoder.pending()[1], Action::wait(MAX_WAIT_MS));
    }

    #[test]
    fn test_settings_changes() {
        let mut encoder = Encoder::new();
        assert_eq!(encoder.flush_interval_ms(), 1000);
        assert!(encoder.embed_delays());

        encoder.set_flush_interval_ms(0).unwrap();
        assert_eq!(encoder.flush_interval_ms(), 0);

        let result = encoder.set_flush_interval_ms(750);
        assert_eq!(result, Err(ConfigError::UnsupportedFlushInterval(750)));
        assert_eq!(encoder.flush_interval_ms(), 0);

        let t0 = Instant::now();
        encoder.observe_at("a", 1, t0);
        encoder.observe_at("ab", 2, t0 + Duration::from_millis(30));
        encoder.set_embed_delays(false);
        assert_eq!(encoder.pending().len(), 3);
    }

    #[test]
    fn test_sequence_wraps() {
        let mut encoder = quiet_encoder();
        encoder.next_sequence = u32::MAX;
        encoder.observe("a", 1);
        assert_eq!(encoder.take_payload(false).sequence, u32::MAX);
        encoder.observe("ab", 2);
        assert_eq!(encoder.take_payload(false).sequence, 0);
    }
}
