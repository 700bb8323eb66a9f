//! Decoder
//!
//! Rebuilds one remote author's in-progress text from the payloads they
//! send and tracks whether the reconstruction can be trusted.
//!
//! ```text
//!           reset                  gap in seq
//!  Empty ─────────▶ InSync ◀───────────────▶ Desynced
//!    ▲                 │    late payload fills       │
//!    └──── clear ──────┴────────────────────────────-┘
//! ```
//!
//! A reset payload is trusted unconditionally and always returns the
//! decoder to `InSync`. While desynchronized the buffer is frozen; edit
//! payloads are held so that a late arrival of the missing payload can
//! restore continuity.

use std::collections::{BTreeMap, VecDeque};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use super::action::{Action, Applied};
use super::payload::Payload;
use crate::core::MAX_HELD_PAYLOADS;

/// Synchronization state of a reconstruction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SyncStatus {
    /// No reconstruction yet.
    #[default]
    Empty,
    /// Reconstruction believed to match the sender.
    InSync,
    /// A payload was missed; buffer frozen until resync.
    Desynced,
}

/// How a payload was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeKind {
    /// Reset payload; buffer restarted from empty.
    Reset,
    /// Actions applied immediately.
    Applied,
    /// Actions staged for delay playback (some may already be applied).
    Staged,
    /// Sequence already applied; ignored.
    Duplicate,
    /// Out of sequence; held while desynchronized.
    Held,
    /// Missing payload arrived; held payloads replayed.
    Recovered,
}

/// Result of [`Decoder::decode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOutcome {
    /// How the payload was handled.
    pub kind: DecodeKind,
    /// Whether the reconstructed text changed.
    pub changed: bool,
    /// Status after handling.
    pub status: SyncStatus,
}

/// Per-author real-time text decoder.
#[derive(Debug, Clone)]
pub struct Decoder {
    /// Reconstructed text
    text: String,
    /// Remote caret, in chars
    cursor: usize,
    /// Sequence of the last applied payload
    last_applied: Option<u32>,
    /// Message number of the last applied payload
    message: u32,
    /// Sync state
    status: SyncStatus,
    /// Whether `Wait` actions delay the actions after them
    playback: bool,
    /// Actions waiting for their delay to elapse
    staged: VecDeque<Action>,
    /// When the front of `staged` may be released
    release_at: Option<Instant>,
    /// Payloads received while desynced, by sequence
    held: BTreeMap<u32, Vec<Action>>,
    /// The missing sequence that would restore continuity
    awaiting: Option<u32>,
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder {
    /// Create an empty decoder with delay playback enabled.
    pub fn new() -> Self {
        Self::with_playback(true)
    }

    /// Create an empty decoder.
    pub fn with_playback(playback: bool) -> Self {
        Self {
            text: String::new(),
            cursor: 0,
            last_applied: None,
            message: 0,
            status: SyncStatus::Empty,
            playback,
            staged: VecDeque::new(),
            release_at: None,
            held: BTreeMap::new(),
            awaiting: None,
        }
    }

    /// Decode a payload received now.
    pub fn decode(&mut self, payload: &Payload) -> DecodeOutcome {
        self.decode_at(payload, Instant::now())
    }

    /// Decode a payload received at `now`.
    ///
    /// Payloads must be fed in transport delivery order.
    pub fn decode_at(&mut self, payload: &Payload, now: Instant) -> DecodeOutcome {
        debug!(
            seq = payload.sequence,
            msg = payload.message,
            event = ?payload.event,
            actions = payload.actions.len(),
            status = ?self.status,
            "decoding rtt payload"
        );

        if payload.is_reset() {
            return self.handle_reset(payload, now);
        }

        let Some(last) = self.last_applied else {
            // Edit with no base: the reset that started this message was lost.
            if self.status != SyncStatus::Desynced {
                warn!(seq = payload.sequence, "rtt edit without a preceding reset");
            }
            self.status = SyncStatus::Desynced;
            self.hold(payload);
            return self.outcome(DecodeKind::Held, false);
        };

        if is_stale(payload.sequence, last) {
            return self.outcome(DecodeKind::Duplicate, false);
        }

        let expected = last.wrapping_add(1);
        match self.status {
            SyncStatus::Desynced if self.awaiting == Some(payload.sequence) => {
                let changed = self.recover(payload);
                self.outcome(DecodeKind::Recovered, changed)
            }
            SyncStatus::Desynced => {
                self.hold(payload);
                self.outcome(DecodeKind::Held, false)
            }
            _ if payload.sequence == expected => {
                self.last_applied = Some(payload.sequence);
                self.message = payload.message;
                let changed = self.enqueue(&payload.actions, now);
                let kind = if self.staged.is_empty() {
                    DecodeKind::Applied
                } else {
                    DecodeKind::Staged
                };
                self.outcome(kind, changed)
            }
            _ => {
                warn!(
                    expected,
                    received = payload.sequence,
                    "rtt sequence gap, freezing reconstruction"
                );
                // Whatever was staged arrived in order; show it before freezing.
                let changed = self.flush_staged();
                self.status = SyncStatus::Desynced;
                self.awaiting = Some(expected);
                self.hold(payload);
                self.outcome(DecodeKind::Held, changed)
            }
        }
    }

    fn handle_reset(&mut self, payload: &Payload, now: Instant) -> DecodeOutcome {
        let had_text = !self.text.is_empty();
        if self.status == SyncStatus::Desynced {
            info!(seq = payload.sequence, dropped = self.held.len(), "rtt resynchronized on reset");
        }

        self.text.clear();
        self.cursor = 0;
        self.staged.clear();
        self.release_at = None;
        self.held.clear();
        self.awaiting = None;
        self.last_applied = Some(payload.sequence);
        self.message = payload.message;
        self.status = SyncStatus::InSync;

        let changed = self.enqueue(&payload.actions, now) || had_text;
        self.outcome(DecodeKind::Reset, changed)
    }

    /// Apply the late payload, then every contiguous held payload after it.
    fn recover(&mut self, payload: &Payload) -> bool {
        let mut changed = self.apply_all(&payload.actions);
        let mut last = payload.sequence;
        self.message = payload.message;

        while let Some(actions) = self.held.remove(&last.wrapping_add(1)) {
            changed |= self.apply_all(&actions);
            last = last.wrapping_add(1);
        }
        self.last_applied = Some(last);

        if self.held.is_empty() {
            info!(seq = last, "rtt recovered from sequence gap");
            self.status = SyncStatus::InSync;
            self.awaiting = None;
        } else {
            self.awaiting = Some(last.wrapping_add(1));
        }
        changed
    }

    fn hold(&mut self, payload: &Payload) {
        if self.held.len() >= MAX_HELD_PAYLOADS {
            warn!(
                held = self.held.len(),
                "too many rtt payloads held, waiting for next reset"
            );
            self.held.clear();
            self.awaiting = None;
        }
        self.held.insert(payload.sequence, payload.actions.clone());
    }

    /// Queue actions for playback, or apply them all when playback is off.
    fn enqueue(&mut self, actions: &[Action], now: Instant) -> bool {
        if !self.playback {
            return self.apply_all(actions);
        }
        // Playback lag never exceeds one payload.
        let mut changed = self.flush_staged();
        self.staged.extend(actions.iter().cloned());
        changed |= self.release_due(now);
        changed
    }

    /// Apply every staged action whose delay has elapsed by `now`.
    ///
    /// Returns whether the text changed.
    pub fn release_due(&mut self, now: Instant) -> bool {
        let mut changed = false;
        while !self.staged.is_empty() {
            if self.release_at.is_some_and(|at| now < at) {
                break;
            }
            let Some(action) = self.staged.pop_front() else {
                break;
            };
            match action {
                Action::Wait { milliseconds } => {
                    let base = self.release_at.unwrap_or(now);
                    self.release_at = Some(base + Duration::from_millis(milliseconds as u64));
                }
                edit => changed |= self.apply(&edit),
            }
        }
        if self.staged.is_empty() {
            self.release_at = None;
        }
        changed
    }

    /// When the next staged action becomes due, if any are staged.
    pub fn next_release(&self) -> Option<Instant> {
        if self.staged.is_empty() {
            None
        } else {
            self.release_at
        }
    }

    /// Check whether actions are waiting on delay playback.
    pub fn has_staged(&self) -> bool {
        !self.staged.is_empty()
    }

    /// Apply every staged action now, ignoring pending delays.
    ///
    /// Returns whether the text changed.
    pub fn full_decode_now(&mut self) -> bool {
        self.flush_staged()
    }

    fn flush_staged(&mut self) -> bool {
        let staged: Vec<Action> = self.staged.drain(..).collect();
        self.release_at = None;
        self.apply_all(&staged)
    }

    fn apply_all(&mut self, actions: &[Action]) -> bool {
        actions
            .iter()
            .fold(false, |changed, action| self.apply(action) || changed)
    }

    fn apply(&mut self, action: &Action) -> bool {
        match action.apply_to(&mut self.text) {
            Applied::Edited { cursor, clamped } => {
                if clamped {
                    debug!(?action, len = self.text.chars().count(), "clamped out of range rtt action");
                }
                self.cursor = cursor;
                true
            }
            Applied::Unchanged | Applied::Wait(_) => false,
        }
    }

    fn outcome(&self, kind: DecodeKind, changed: bool) -> DecodeOutcome {
        DecodeOutcome {
            kind,
            changed,
            status: self.status,
        }
    }

    /// Toggle delay playback. Turning it off applies staged actions now.
    ///
    /// Returns whether the text changed.
    pub fn set_playback(&mut self, playback: bool) -> bool {
        self.playback = playback;
        if playback { false } else { self.flush_staged() }
    }

    /// Whether delay playback is enabled.
    pub fn playback(&self) -> bool {
        self.playback
    }

    /// Check whether the reconstruction can be trusted.
    ///
    /// An empty decoder has nothing to distrust and reports `true`.
    pub fn in_sync(&self) -> bool {
        self.status != SyncStatus::Desynced
    }

    /// Current sync state.
    pub fn status(&self) -> SyncStatus {
        self.status
    }

    /// Reconstructed text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Remote caret position in chars.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Sequence of the last applied payload.
    pub fn last_applied_sequence(&self) -> Option<u32> {
        self.last_applied
    }

    /// Message number of the last applied payload.
    pub fn message(&self) -> u32 {
        self.message
    }

    /// Number of payloads held while desynchronized.
    pub fn held_count(&self) -> usize {
        self.held.len()
    }

    /// Reconstructed text with `marker` spliced in at the remote caret.
    pub fn render(&self, marker: Option<char>) -> String {
        let Some(marker) = marker else {
            return self.text.clone();
        };
        let mut out = String::with_capacity(self.text.len() + marker.len_utf8());
        let mut placed = false;
        for (i, c) in self.text.chars().enumerate() {
            if i == self.cursor {
                out.push(marker);
                placed = true;
            }
            out.push(c);
        }
        if !placed {
            out.push(marker);
        }
        out
    }

    /// Return to `Empty`, dropping text, staged and held actions.
    pub fn clear(&mut self) {
        let playback = self.playback;
        *self = Self::with_playback(playback);
    }
}

/// Whether `seq` was already applied, given the last applied sequence.
fn is_stale(seq: u32, last: u32) -> bool {
    let delta = seq.wrapping_sub(last);
    delta == 0 || delta > u32::MAX / 2
}
