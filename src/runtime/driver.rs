//! Flush and playback loops.
//!
//! The conversation is shared behind a tokio mutex. Handles mutate it and
//! poke a [`Notify`]; the loops own the timers. Every instant handed to the
//! conversation comes from the tokio clock so paused-time tests and
//! production see the same pacing.

use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{Mutex, Notify, mpsc, watch};
use tokio::time::{self, Instant as TokioInstant};
use tracing::debug;

use crate::codec::PacerAction;
use crate::core::{IMMEDIATE_FLUSH_FLOOR, WireError};
use crate::session::{Conversation, Envelope, ReceiveOutcome};

/// Errors raised by the async drivers.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// The outgoing channel's receiver was dropped.
    #[error("outgoing channel closed")]
    ChannelClosed,

    /// An envelope could not be re-encoded on a link.
    #[error("wire error: {0}")]
    Wire(#[from] WireError),
}

/// Identity types usable across tasks.
pub trait Author: Eq + Hash + Clone + Debug + Send + 'static {}

impl<T: Eq + Hash + Clone + Debug + Send + 'static> Author for T {}

/// A conversation shared between handles and loops.
pub type SharedConversation<K> = Arc<Mutex<Conversation<K>>>;

/// Wrap a conversation for sharing.
pub fn shared<K>(conversation: Conversation<K>) -> SharedConversation<K> {
    Arc::new(Mutex::new(conversation))
}

fn now() -> std::time::Instant {
    TokioInstant::now().into_std()
}

/// Resolves once shutdown is requested or the sender is gone.
async fn stopped(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}

/// Handle for the outgoing side of a conversation.
#[derive(Debug, Clone)]
pub struct FlushDriver<K> {
    conversation: SharedConversation<K>,
    outgoing: mpsc::Sender<Envelope>,
    edited: Arc<Notify>,
}

impl<K: Author> FlushDriver<K> {
    /// Create a driver sending envelopes on `outgoing`.
    pub fn new(conversation: SharedConversation<K>, outgoing: mpsc::Sender<Envelope>) -> Self {
        Self {
            conversation,
            outgoing,
            edited: Arc::new(Notify::new()),
        }
    }

    /// The shared conversation.
    pub fn conversation(&self) -> &SharedConversation<K> {
        &self.conversation
    }

    /// Record a change to the local text box and wake the flush loop.
    pub async fn local_edit(&self, text: &str, cursor: usize) {
        self.conversation
            .lock()
            .await
            .local_edit_at(text, cursor, now());
        self.edited.notify_one();
    }

    /// Commit `text` and send it at once.
    ///
    /// Returns `false` when the message was empty and nothing was sent.
    pub async fn commit(&self, text: &str) -> Result<bool, RuntimeError> {
        let envelope = self.conversation.lock().await.commit_at(text, now());
        match envelope {
            Some(envelope) => {
                self.send(envelope).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Clear the conversation, blanking the peer's view if needed.
    pub async fn clear(&self) -> Result<(), RuntimeError> {
        let farewell = self.conversation.lock().await.clear_at(now());
        if let Some(envelope) = farewell {
            self.send(envelope).await?;
        }
        Ok(())
    }

    async fn send(&self, envelope: Envelope) -> Result<(), RuntimeError> {
        self.outgoing
            .send(envelope)
            .await
            .map_err(|_| RuntimeError::ChannelClosed)
    }

    /// Run the flush loop until `shutdown` turns true or its sender drops.
    pub async fn run(self, shutdown: watch::Receiver<bool>) -> Result<(), RuntimeError> {
        run_flush_loop(self, shutdown).await
    }
}

/// Drain the encoder whenever its pacer says so.
///
/// Sleeps while idle, wakes on local edits, and with a zero interval still
/// leaves [`IMMEDIATE_FLUSH_FLOOR`] between transmissions.
pub async fn run_flush_loop<K: Author>(
    driver: FlushDriver<K>,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), RuntimeError> {
    loop {
        let (action, interval_ms) = {
            let conversation = driver.conversation.lock().await;
            (
                conversation.poll_flush(now()),
                conversation.config().flush_interval_ms,
            )
        };

        match action {
            PacerAction::SendNow => {
                let envelope = driver.conversation.lock().await.flush_at(now());
                if let Some(envelope) = envelope {
                    driver.send(envelope).await?;
                }
                if interval_ms == 0 {
                    tokio::select! {
                        _ = time::sleep(IMMEDIATE_FLUSH_FLOOR) => {}
                        _ = stopped(&mut shutdown) => break,
                    }
                }
            }
            PacerAction::WaitUntil(deadline) => {
                tokio::select! {
                    _ = time::sleep_until(TokioInstant::from_std(deadline)) => {}
                    _ = driver.edited.notified() => {}
                    _ = stopped(&mut shutdown) => break,
                }
            }
            PacerAction::Idle => {
                tokio::select! {
                    _ = driver.edited.notified() => {}
                    _ = stopped(&mut shutdown) => break,
                }
            }
        }
    }
    debug!("flush loop stopped");
    Ok(())
}

/// Handle for the incoming side of a conversation.
#[derive(Debug, Clone)]
pub struct PlaybackDriver<K> {
    conversation: SharedConversation<K>,
    wake: Arc<Notify>,
}

impl<K: Author> PlaybackDriver<K> {
    /// Create a driver for `conversation`.
    pub fn new(conversation: SharedConversation<K>) -> Self {
        Self {
            conversation,
            wake: Arc::new(Notify::new()),
        }
    }

    /// The shared conversation.
    pub fn conversation(&self) -> &SharedConversation<K> {
        &self.conversation
    }

    /// Hand an envelope from `from` to the conversation.
    pub async fn receive(&self, from: &K, envelope: &Envelope) -> ReceiveOutcome {
        let outcome = self
            .conversation
            .lock()
            .await
            .receive_at(from, envelope, now());
        self.wake.notify_one();
        outcome
    }

    /// Run the playback loop until `shutdown` turns true or its sender drops.
    pub async fn run(self, shutdown: watch::Receiver<bool>) {
        run_playback_loop(self.conversation, self.wake, shutdown).await
    }
}

/// Release delayed remote actions as their waits elapse.
pub async fn run_playback_loop<K: Author>(
    conversation: SharedConversation<K>,
    wake: Arc<Notify>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        let next = conversation.lock().await.next_playback();
        match next {
            Some(at) => {
                tokio::select! {
                    _ = time::sleep_until(TokioInstant::from_std(at)) => {
                        conversation.lock().await.release_due(now());
                    }
                    _ = wake.notified() => {}
                    _ = stopped(&mut shutdown) => break,
                }
            }
            None => {
                tokio::select! {
                    _ = wake.notified() => {}
                    _ = stopped(&mut shutdown) => break,
                }
            }
        }
    }
    debug!("playback loop stopped");
}
