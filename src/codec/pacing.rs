//! Flush pacing.
//!
//! Decides when queued actions should be drained and transmitted. The
//! encoder only answers "is there anything to send"; this pacer answers
//! "is it time", mirroring a send timer that starts on the first change,
//! ticks every flush interval while there is something to send, and stops
//! on the first tick that finds nothing.

use std::time::{Duration, Instant};

/// Action the pacer recommends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacerAction {
    /// Drain and transmit now.
    SendNow,
    /// Wait until the specified instant before sending.
    WaitUntil(Instant),
    /// Nothing pending.
    Idle,
}

/// Flush pacer driven by explicit instants.
#[derive(Debug, Clone)]
pub struct FlushPacer {
    /// Interval between flushes; zero flushes on every change.
    interval: Duration,
    /// When we last flushed.
    last_flush: Option<Instant>,
    /// When the oldest unflushed change happened.
    pending_since: Option<Instant>,
}

impl FlushPacer {
    /// Create a pacer with the given flush interval.
    pub fn new(interval_ms: u32) -> Self {
        Self {
            interval: Duration::from_millis(interval_ms as u64),
            last_flush: None,
            pending_since: None,
        }
    }

    /// Current flush interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Change the flush interval.
    pub fn set_interval_ms(&mut self, interval_ms: u32) {
        self.interval = Duration::from_millis(interval_ms as u64);
    }

    /// Notify the pacer that the local buffer changed.
    pub fn on_change(&mut self, now: Instant) {
        if self.pending_since.is_none() {
            self.pending_since = Some(now);
        }
    }

    /// Notify the pacer that a payload was transmitted.
    pub fn on_flush(&mut self, now: Instant) {
        self.last_flush = Some(now);
        self.pending_since = None;
    }

    /// Forget pending changes (message discarded or committed).
    pub fn clear_pending(&mut self) {
        self.pending_since = None;
    }

    /// When the next flush is due, if anything is pending.
    pub fn deadline(&self) -> Option<Instant> {
        let since = self.pending_since?;
        if self.interval.is_zero() {
            return Some(since);
        }

        // Timer still running from the last flush: next tick picks it up.
        // Otherwise the timer restarts at the change.
        let deadline = match self.last_flush {
            Some(last) if since <= last + self.interval => last + self.interval,
            _ => since + self.interval,
        };
        Some(deadline)
    }

    /// Determine what to do at `now`.
    pub fn poll(&self, now: Instant) -> PacerAction {
        match self.deadline() {
            None => PacerAction::Idle,
            Some(deadline) if now >= deadline => PacerAction::SendNow,
            Some(deadline) => PacerAction::WaitUntil(deadline),
        }
    }
}

impl Default for FlushPacer {
    fn default() -> Self {
        Self::new(crate::core::DEFAULT_FLUSH_INTERVAL_MS)
    }
}
