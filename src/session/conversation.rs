//! Conversation state
//!
//! Ties one local encoder and a registry of remote decoders to the list of
//! committed chat lines, and applies the user's real-time text settings.
//! Everything here is synchronous; [`crate::runtime`] supplies the timers.

use std::hash::Hash;
use std::time::Instant;

use tracing::{debug, info};

use super::config::{Preset, RttConfig};
use super::envelope::Envelope;
use crate::codec::{DecodeOutcome, DecoderRegistry, Encoder, FlushPacer, PacerAction, Snapshot};
use crate::core::{CURSOR_CHAR, ConfigError};

/// A committed message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatLine<K> {
    /// Who wrote it.
    pub author: K,
    /// Final text.
    pub text: String,
    /// Whether the local party wrote it.
    pub local: bool,
}

/// Rendered in-progress text of one remote author.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteView<K> {
    /// Author.
    pub author: K,
    /// Text, with the cursor marker when enabled.
    pub text: String,
    /// False when the reconstruction is frozen; render it distinguished.
    pub in_sync: bool,
}

/// Result of [`Conversation::receive`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReceiveOutcome {
    /// How the `rtt` element was decoded, if one was present and used.
    pub rtt: Option<DecodeOutcome>,
    /// Whether a final body was appended to the chat lines.
    pub committed: bool,
}

impl ReceiveOutcome {
    /// Whether anything visible changed.
    pub fn changed(&self) -> bool {
        self.committed || self.rtt.is_some_and(|o| o.changed)
    }
}

/// One conversation between the local party and any number of remote
/// authors.
#[derive(Debug, Clone)]
pub struct Conversation<K> {
    /// Local identity, used as the author of local lines
    local: K,
    config: RttConfig,
    encoder: Encoder,
    pacer: FlushPacer,
    decoders: DecoderRegistry<K>,
    lines: Vec<ChatLine<K>>,
    /// Latest local buffer not yet observed (delays off)
    draft: Option<Snapshot>,
}

impl<K: Eq + Hash + Clone + std::fmt::Debug> Conversation<K> {
    /// Create a conversation.
    pub fn new(local: K, config: RttConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            local,
            config,
            encoder: Encoder::with_settings(config.flush_interval_ms, config.embed_delays)?,
            pacer: FlushPacer::new(config.flush_interval_ms),
            decoders: DecoderRegistry::with_playback(config.embed_delays),
            lines: Vec::new(),
            draft: None,
        })
    }

    /// Local identity.
    pub fn local(&self) -> &K {
        &self.local
    }

    /// Current settings.
    pub fn config(&self) -> &RttConfig {
        &self.config
    }

    /// Committed lines, oldest first.
    pub fn lines(&self) -> &[ChatLine<K>] {
        &self.lines
    }

    /// Local encoder.
    pub fn encoder(&self) -> &Encoder {
        &self.encoder
    }

    /// Remote decoders.
    pub fn decoders(&self) -> &DecoderRegistry<K> {
        &self.decoders
    }

    // -------------------------------------------------------------------------
    // Outgoing
    // -------------------------------------------------------------------------

    /// Record a change to the local text box.
    pub fn local_edit(&mut self, text: &str, cursor: usize) {
        self.local_edit_at(text, cursor, Instant::now());
    }

    /// Record a change to the local text box at `now`.
    ///
    /// With delays on every change is diffed at once so key press timing is
    /// preserved; with delays off only the state at flush time is diffed.
    pub fn local_edit_at(&mut self, text: &str, cursor: usize, now: Instant) {
        if !self.config.rtt_enabled {
            return;
        }
        if self.config.embed_delays {
            self.draft = None;
            if self.encoder.observe_at(text, cursor, now) > 0 {
                self.pacer.on_change(now);
            }
        } else {
            if text != self.encoder.snapshot().text {
                self.pacer.on_change(now);
            }
            self.draft = Some(Snapshot::new(text, cursor));
        }
    }

    /// What the flush timer should do at `now`.
    pub fn poll_flush(&self, now: Instant) -> PacerAction {
        if !self.config.rtt_enabled {
            return PacerAction::Idle;
        }
        self.pacer.poll(now)
    }

    /// Drain pending edits into an update envelope.
    ///
    /// Returns `None` when there is nothing to send.
    pub fn flush(&mut self) -> Option<Envelope> {
        self.flush_at(Instant::now())
    }

    /// Drain pending edits at `now`.
    pub fn flush_at(&mut self, now: Instant) -> Option<Envelope> {
        if !self.config.rtt_enabled {
            return None;
        }
        if let Some(draft) = self.draft.take() {
            self.encoder.observe_at(&draft.text, draft.cursor, now);
        }
        if !self.encoder.has_pending() {
            self.pacer.clear_pending();
            return None;
        }
        let payload = self.encoder.take_payload(false);
        self.pacer.on_flush(now);
        Some(Envelope::update(payload))
    }

    /// Send `text` as a finished message.
    ///
    /// Returns `None` for an empty message.
    pub fn commit(&mut self, text: &str) -> Option<Envelope> {
        self.commit_at(text, Instant::now())
    }

    /// Send `text` as a finished message at `now`.
    pub fn commit_at(&mut self, text: &str, now: Instant) -> Option<Envelope> {
        if text.is_empty() {
            return None;
        }
        self.draft = None;

        let payload = self.config.rtt_enabled.then(|| {
            self.encoder.observe_at(text, text.chars().count(), now);
            self.encoder.take_payload(true)
        });
        self.pacer.on_flush(now);

        self.lines.push(ChatLine {
            author: self.local.clone(),
            text: text.to_string(),
            local: true,
        });
        Some(Envelope::commit(payload, text))
    }

    // -------------------------------------------------------------------------
    // Incoming
    // -------------------------------------------------------------------------

    /// Handle an envelope from `from`.
    pub fn receive(&mut self, from: &K, envelope: &Envelope) -> ReceiveOutcome {
        self.receive_at(from, envelope, Instant::now())
    }

    /// Handle an envelope from `from` received at `now`.
    pub fn receive_at(&mut self, from: &K, envelope: &Envelope, now: Instant) -> ReceiveOutcome {
        let mut outcome = ReceiveOutcome::default();

        if self.config.rtt_enabled
            && let Some(payload) = envelope.payload()
        {
            outcome.rtt = Some(self.decoders.decode_at(from, &payload, now));
        }

        if let Some(body) = &envelope.body {
            debug!(?from, len = body.chars().count(), "remote message committed");
            if let Some(decoder) = self.decoders.get_mut(from) {
                decoder.clear();
            }
            self.lines.push(ChatLine {
                author: from.clone(),
                text: body.clone(),
                local: false,
            });
            outcome.committed = true;
        }
        outcome
    }

    /// Earliest delay playback deadline across remote authors.
    pub fn next_playback(&self) -> Option<Instant> {
        self.decoders.next_release()
    }

    /// Release remote actions whose delay has elapsed.
    pub fn release_due(&mut self, now: Instant) -> bool {
        self.decoders.release_due(now)
    }

    // -------------------------------------------------------------------------
    // Presentation
    // -------------------------------------------------------------------------

    /// In-progress text of `author`, if they are typing.
    pub fn remote_view(&self, author: &K) -> Option<RemoteView<K>> {
        let decoder = self.decoders.get(author)?;
        self.view(author, decoder)
    }

    /// In-progress text of every remote author who is typing.
    pub fn remote_views(&self) -> Vec<RemoteView<K>> {
        self.decoders
            .iter()
            .filter_map(|(author, decoder)| self.view(author, decoder))
            .collect()
    }

    fn view(&self, author: &K, decoder: &crate::codec::Decoder) -> Option<RemoteView<K>> {
        if decoder.text().is_empty() && decoder.in_sync() {
            return None;
        }
        let marker = self.config.show_remote_cursor.then_some(CURSOR_CHAR);
        Some(RemoteView {
            author: author.clone(),
            text: decoder.render(marker),
            in_sync: decoder.in_sync(),
        })
    }

    // -------------------------------------------------------------------------
    // Lifecycle and settings
    // -------------------------------------------------------------------------

    /// Clear the conversation.
    ///
    /// Returns an update that blanks the peer's view of our unsent text, if
    /// there was any.
    pub fn clear(&mut self) -> Option<Envelope> {
        self.clear_at(Instant::now())
    }

    /// Clear the conversation at `now`.
    pub fn clear_at(&mut self, now: Instant) -> Option<Envelope> {
        let farewell = if self.config.rtt_enabled {
            self.draft = None;
            self.encoder.observe_at("", 0, now);
            self.encoder
                .has_pending()
                .then(|| Envelope::update(self.encoder.take_payload(false)))
        } else {
            None
        };

        info!(lines = self.lines.len(), authors = self.decoders.len(), "clearing conversation");
        self.encoder.reset();
        self.pacer.clear_pending();
        self.decoders.clear();
        self.lines.clear();
        self.draft = None;
        farewell
    }

    /// Turn real-time text on or off. Off drops all in-progress state.
    pub fn set_rtt_enabled(&mut self, enabled: bool) {
        self.config.rtt_enabled = enabled;
        if !enabled {
            self.encoder.reset();
            self.pacer.clear_pending();
            self.decoders.clear();
            self.draft = None;
        }
    }

    /// Change the flush interval.
    pub fn set_flush_interval(&mut self, ms: u32) -> Result<(), ConfigError> {
        self.encoder.set_flush_interval_ms(ms)?;
        self.pacer.set_interval_ms(ms);
        self.config.flush_interval_ms = ms;
        Ok(())
    }

    /// Toggle key press interval embedding and playback.
    ///
    /// Returns whether any remote text changed (staged actions applied).
    pub fn set_embed_delays(&mut self, embed: bool) -> bool {
        self.config.embed_delays = embed;
        self.encoder.set_embed_delays(embed);
        self.decoders.set_playback(embed)
    }

    /// Toggle the remote cursor marker.
    pub fn set_show_remote_cursor(&mut self, show: bool) {
        self.config.show_remote_cursor = show;
    }

    /// Apply a named preset.
    ///
    /// Returns whether any remote text changed.
    pub fn apply_preset(&mut self, preset: Preset) -> Result<bool, ConfigError> {
        let target = RttConfig::from_preset(preset);
        self.set_flush_interval(target.flush_interval_ms)?;
        self.set_show_remote_cursor(target.show_remote_cursor);
        Ok(self.set_embed_delays(target.embed_delays))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{Action, DecodeKind, Payload, PayloadEvent, SyncStatus};
    use std::time::Duration;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn pair(config: RttConfig) -> (Conversation<&'static str>, Conversation<&'static str>) {
        (
            Conversation::new("alice", config).unwrap(),
            Conversation::new("bob", config).unwrap(),
        )
    }

    fn bursty() -> RttConfig {
        RttConfig::from_preset(Preset::BurstyText)
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = RttConfig {
            flush_interval_ms: 42,
            ..RttConfig::default()
        };
        assert!(Conversation::new("me", config).is_err());
    }

    #[test]
    fn test_typing_reaches_peer() {
        let (mut alice, mut bob) = pair(bursty());
        let t0 = Instant::now();

        alice.local_edit_at("h", 1, t0);
        alice.local_edit_at("hi", 2, t0 + ms(50));
        let env = alice.flush_at(t0 + ms(1000)).unwrap();
        assert_eq!(env.rtt.as_ref().unwrap().event, PayloadEvent::Reset);

        let outcome = bob.receive_at(&"alice", &env, t0 + ms(1010));
        assert!(outcome.changed());
        assert!(!outcome.committed);

        let view = bob.remote_view(&"alice").unwrap();
        assert_eq!(view.text, "hi");
        assert!(view.in_sync);
    }

    #[test]
    fn test_delays_off_diffs_once_per_flush() {
        let (mut alice, _) = pair(bursty());
        let t0 = Instant::now();
        alice.local_edit_at("h", 1, t0);
        alice.local_edit_at("he", 2, t0);
        alice.local_edit_at("hey", 3, t0);

        let env = alice.flush_at(t0 + ms(1000)).unwrap();
        assert_eq!(env.rtt.unwrap().actions, vec![Action::insert(0, "hey")]);
        assert!(alice.flush_at(t0 + ms(2000)).is_none());
    }

    #[test]
    fn test_enabling_delays_discards_pending_draft() {
        let (mut alice, mut bob) = pair(bursty());
        let t0 = Instant::now();
        alice.local_edit_at("ab", 2, t0);
        alice.set_embed_delays(true);
        alice.local_edit_at("abc", 3, t0 + ms(10));

        let env = alice.flush_at(t0 + ms(1000)).unwrap();
        assert_eq!(env.rtt.as_ref().unwrap().actions, vec![Action::insert(0, "abc")]);
        assert_eq!(alice.encoder().snapshot().text, "abc");

        bob.receive_at(&"alice", &env, t0 + ms(1000));
        let view = bob.remote_view(&"alice").unwrap();
        assert_eq!(view.text, "abc");
        assert!(view.in_sync);
    }

    #[test]
    fn test_delays_on_keeps_keystrokes() {
        let (mut alice, mut bob) = pair(RttConfig::default());
        let t0 = Instant::now();
        alice.local_edit_at("o", 1, t0);
        alice.local_edit_at("ok", 2, t0 + ms(200));

        let env = alice.flush_at(t0 + ms(1000)).unwrap();
        assert_eq!(
            env.rtt.as_ref().unwrap().actions,
            vec![Action::insert(0, "o"), Action::wait(200), Action::insert(1, "k")]
        );

        let outcome = bob.receive_at(&"alice", &env, t0 + ms(1000));
        assert_eq!(outcome.rtt.unwrap().kind, DecodeKind::Reset);
        assert!(bob.decoders().get(&"alice").unwrap().has_staged());
        assert_eq!(bob.remote_view(&"alice").unwrap().text, format!("o{CURSOR_CHAR}"));
        assert_eq!(bob.next_playback(), Some(t0 + ms(1200)));

        assert!(bob.release_due(t0 + ms(1200)));
        assert_eq!(bob.remote_view(&"alice").unwrap().text, format!("ok{CURSOR_CHAR}"));
    }

    #[test]
    fn test_flush_pacing() {
        let config = RttConfig::from_preset(Preset::LowLag);
        let (mut alice, _) = pair(config);
        let t0 = Instant::now();
        assert_eq!(alice.poll_flush(t0), PacerAction::Idle);

        alice.local_edit_at("a", 1, t0);
        assert_eq!(alice.poll_flush(t0), PacerAction::WaitUntil(t0 + ms(500)));
        assert_eq!(alice.poll_flush(t0 + ms(500)), PacerAction::SendNow);

        alice.flush_at(t0 + ms(500));
        assert_eq!(alice.poll_flush(t0 + ms(600)), PacerAction::Idle);
    }

    #[test]
    fn test_commit_appends_lines_both_sides() {
        let (mut alice, mut bob) = pair(bursty());
        let t0 = Instant::now();
        alice.local_edit_at("yo", 2, t0);
        bob.receive_at(&"alice", &alice.flush_at(t0).unwrap(), t0);
        assert!(bob.remote_view(&"alice").is_some());

        let env = alice.commit_at("yo!", t0 + ms(300)).unwrap();
        assert!(env.is_commit());
        assert_eq!(alice.lines()[0].text, "yo!");
        assert!(alice.lines()[0].local);

        let outcome = bob.receive_at(&"alice", &env, t0 + ms(310));
        assert!(outcome.committed);
        assert_eq!(bob.lines()[0].author, "alice");
        assert!(!bob.lines()[0].local);
        assert!(bob.remote_view(&"alice").is_none());
        assert_eq!(bob.decoders().get(&"alice").unwrap().status(), SyncStatus::Empty);

        // Next message starts over from an empty buffer
        alice.local_edit_at("n", 1, t0 + ms(400));
        let env = alice.flush_at(t0 + ms(1300)).unwrap();
        let rtt = env.rtt.unwrap();
        assert_eq!(rtt.event, PayloadEvent::Reset);
        assert_eq!(rtt.msg, 1);
        assert_eq!(rtt.actions, vec![Action::insert(0, "n")]);
    }

    #[test]
    fn test_empty_commit_ignored() {
        let (mut alice, _) = pair(bursty());
        assert!(alice.commit("").is_none());
        assert!(alice.lines().is_empty());
    }

    #[test]
    fn test_lost_update_shows_desynced() {
        let (mut alice, mut bob) = pair(bursty());
        let t0 = Instant::now();

        alice.local_edit_at("a", 1, t0);
        bob.receive_at(&"alice", &alice.flush_at(t0).unwrap(), t0);
        alice.local_edit_at("ab", 2, t0);
        let _lost = alice.flush_at(t0 + ms(1000)).unwrap();
        alice.local_edit_at("abc", 3, t0);
        bob.receive_at(&"alice", &alice.flush_at(t0 + ms(2000)).unwrap(), t0);

        let view = bob.remote_view(&"alice").unwrap();
        assert!(!view.in_sync);
        assert_eq!(view.text, "a");

        // Committing resyncs the next message
        let commit = alice.commit_at("abc", t0 + ms(2500)).unwrap();
        bob.receive_at(&"alice", &commit, t0);
        alice.local_edit_at("z", 1, t0);
        bob.receive_at(&"alice", &alice.flush_at(t0 + ms(3000)).unwrap(), t0);
        assert!(bob.remote_view(&"alice").unwrap().in_sync);
    }

    #[test]
    fn test_rtt_disabled_exchanges_only_bodies() {
        let config = RttConfig {
            rtt_enabled: false,
            ..bursty()
        };
        let (mut alice, mut bob) = pair(config);
        alice.local_edit("typing", 6);
        assert!(alice.flush().is_none());

        let env = alice.commit("typed").unwrap();
        assert!(env.rtt.is_none());

        // An rtt element from a peer that still has it on is ignored
        let foreign = Envelope::update(Payload::reset(1, 0, vec![Action::insert(0, "x")]));
        let outcome = bob.receive(&"alice", &foreign);
        assert_eq!(outcome, ReceiveOutcome::default());
        assert!(bob.decoders().is_empty());

        assert!(bob.receive(&"alice", &env).committed);
    }

    #[test]
    fn test_disabling_rtt_drops_state() {
        let (mut alice, mut bob) = pair(bursty());
        alice.local_edit("draft", 5);
        bob.receive(&"alice", &alice.flush().unwrap());
        alice.local_edit("drafty", 6);

        alice.set_rtt_enabled(false);
        bob.set_rtt_enabled(false);
        assert!(!alice.encoder().has_pending());
        assert!(bob.decoders().is_empty());
        assert!(bob.remote_views().is_empty());
    }

    #[test]
    fn test_clear_blanks_peer() {
        let (mut alice, mut bob) = pair(bursty());
        alice.commit("first").unwrap();
        alice.local_edit("unsent", 6);
        bob.receive(&"alice", &alice.flush().unwrap());
        assert_eq!(bob.remote_view(&"alice").unwrap().text, "unsent");

        let farewell = alice.clear().unwrap();
        assert!(alice.lines().is_empty());
        bob.receive(&"alice", &farewell);
        assert!(bob.remote_view(&"alice").is_none());

        // Nothing typed: nothing to send on clear
        assert!(alice.clear().is_none());
    }

    #[test]
    fn test_cursor_marker_toggle() {
        let (mut alice, mut bob) = pair(bursty());
        bob.set_show_remote_cursor(true);
        alice.local_edit("hey", 1);
        bob.receive(&"alice", &alice.flush().unwrap());
        assert_eq!(bob.remote_views()[0].text, format!("hey{CURSOR_CHAR}"));

        bob.set_show_remote_cursor(false);
        assert_eq!(bob.remote_views()[0].text, "hey");
    }

    #[test]
    fn test_preset_changes() {
        let (mut alice, _) = pair(RttConfig::default());
        alice.apply_preset(Preset::ImmediateTransmit).unwrap();
        assert_eq!(alice.config().preset(), Some(Preset::ImmediateTransmit));
        assert_eq!(alice.encoder().flush_interval_ms(), 0);
        assert!(!alice.encoder().embed_delays());

        assert!(alice.set_flush_interval(123).is_err());
        assert_eq!(alice.config().flush_interval_ms, 0);
    }

    #[test]
    fn test_every_preset_applies() {
        let (mut alice, _) = pair(RttConfig::default());
        for preset in Preset::ALL {
            assert!(alice.apply_preset(preset).is_ok());
            assert_eq!(alice.config().preset(), Some(preset));
            assert_eq!(
                alice.encoder().flush_interval_ms(),
                RttConfig::from_preset(preset).flush_interval_ms
            );
        }
    }
}
