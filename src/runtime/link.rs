//! Lossy in-memory link.
//!
//! Relays envelopes between two conversations through their JSON form and
//! can drop every n-th in-progress update to exercise desync handling.
//! Committing envelopes are always delivered.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use super::driver::RuntimeError;
use crate::session::Envelope;

/// Counters reported when a relay ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkStats {
    /// Envelopes handed to the output.
    pub delivered: usize,
    /// Updates deliberately lost.
    pub dropped: usize,
}

/// In-memory link with configurable update loss.
#[derive(Debug, Clone, Copy, Default)]
pub struct LossyLink {
    /// Drop every n-th update; 0 never drops.
    drop_every: usize,
}

impl LossyLink {
    /// A link that delivers everything.
    pub fn reliable() -> Self {
        Self::default()
    }

    /// A link that loses every `n`-th update.
    pub fn dropping_every(n: usize) -> Self {
        Self { drop_every: n }
    }

    /// Forward envelopes from `input` to `output` until `input` closes.
    pub async fn relay(
        self,
        mut input: mpsc::Receiver<Envelope>,
        output: mpsc::Sender<Envelope>,
    ) -> Result<LinkStats, RuntimeError> {
        let mut stats = LinkStats::default();
        let mut updates = 0usize;

        while let Some(envelope) = input.recv().await {
            if !envelope.is_commit() {
                updates += 1;
                if self.drop_every > 0 && updates % self.drop_every == 0 {
                    debug!(update = updates, "link dropped update");
                    stats.dropped += 1;
                    continue;
                }
            }

            let envelope = Envelope::from_json(&envelope.to_json()?)?;
            output
                .send(envelope)
                .await
                .map_err(|_| RuntimeError::ChannelClosed)?;
            stats.delivered += 1;
        }
        Ok(stats)
    }

    /// Spawn a relay task and return its two ends.
    pub fn spawn(
        self,
        capacity: usize,
    ) -> (
        mpsc::Sender<Envelope>,
        mpsc::Receiver<Envelope>,
        JoinHandle<Result<LinkStats, RuntimeError>>,
    ) {
        let (in_tx, in_rx) = mpsc::channel(capacity);
        let (out_tx, out_rx) = mpsc::channel(capacity);
        let task = tokio::spawn(self.relay(in_rx, out_tx));
        (in_tx, out_rx, task)
    }
}
