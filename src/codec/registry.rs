//! Per-author decoder registry
//!
//! Maps a remote author's identity to the decoder rebuilding their text.
//! Decoders are created on the first payload from an author and dropped
//! when the conversation is cleared. Iteration follows creation order so
//! renderers can list authors stably.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::Instant;

use tracing::debug;

use super::decoder::{DecodeOutcome, Decoder};
use super::payload::Payload;

/// Registry of decoders keyed by author.
#[derive(Debug, Clone)]
pub struct DecoderRegistry<K> {
    decoders: HashMap<K, Decoder>,
    order: Vec<K>,
    playback: bool,
}

impl<K: Eq + Hash + Clone + std::fmt::Debug> DecoderRegistry<K> {
    /// Create an empty registry whose decoders use delay playback.
    pub fn new() -> Self {
        Self::with_playback(true)
    }

    /// Create an empty registry.
    pub fn with_playback(playback: bool) -> Self {
        Self {
            decoders: HashMap::new(),
            order: Vec::new(),
            playback,
        }
    }

    /// Decoder for `author`, created if this is their first payload.
    pub fn get_or_create(&mut self, author: &K) -> &mut Decoder {
        if !self.decoders.contains_key(author) {
            debug!(?author, "creating rtt decoder");
            self.order.push(author.clone());
        }
        let playback = self.playback;
        self.decoders
            .entry(author.clone())
            .or_insert_with(|| Decoder::with_playback(playback))
    }

    /// Route a payload to its author's decoder.
    pub fn decode_at(&mut self, author: &K, payload: &Payload, now: Instant) -> DecodeOutcome {
        self.get_or_create(author).decode_at(payload, now)
    }

    /// Route a payload received now.
    pub fn decode(&mut self, author: &K, payload: &Payload) -> DecodeOutcome {
        self.decode_at(author, payload, Instant::now())
    }

    /// Decoder for `author`, if one exists.
    pub fn get(&self, author: &K) -> Option<&Decoder> {
        self.decoders.get(author)
    }

    /// Mutable decoder for `author`, if one exists.
    pub fn get_mut(&mut self, author: &K) -> Option<&mut Decoder> {
        self.decoders.get_mut(author)
    }

    /// Drop the decoder for `author`.
    pub fn remove(&mut self, author: &K) -> Option<Decoder> {
        self.order.retain(|k| k != author);
        self.decoders.remove(author)
    }

    /// Drop every decoder.
    pub fn clear(&mut self) {
        self.order.clear();
        self.decoders.clear();
    }

    /// Number of decoders.
    pub fn len(&self) -> usize {
        self.decoders.len()
    }

    /// Check if the registry holds no decoders.
    pub fn is_empty(&self) -> bool {
        self.decoders.is_empty()
    }

    /// Decoders in creation order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &Decoder)> {
        self.order
            .iter()
            .filter_map(|k| self.decoders.get(k).map(|d| (k, d)))
    }

    /// Toggle delay playback on every current and future decoder.
    ///
    /// Returns whether any text changed.
    pub fn set_playback(&mut self, playback: bool) -> bool {
        self.playback = playback;
        self.decoders
            .values_mut()
            .fold(false, |changed, d| d.set_playback(playback) || changed)
    }

    /// Earliest staged release across all decoders.
    pub fn next_release(&self) -> Option<Instant> {
        self.decoders.values().filter_map(Decoder::next_release).min()
    }

    /// Release due actions on every decoder.
    ///
    /// Returns whether any text changed.
    pub fn release_due(&mut self, now: Instant) -> bool {
        self.decoders
            .values_mut()
            .fold(false, |changed, d| d.release_due(now) || changed)
    }

    /// Apply all staged actions on every decoder.
    pub fn full_decode_now(&mut self) -> bool {
        self.decoders
            .values_mut()
            .fold(false, |changed, d| d.full_decode_now() || changed)
    }
}

impl<K: Eq + Hash + Clone + std::fmt::Debug> Default for DecoderRegistry<K> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{Action, SyncStatus};
    use std::time::Duration;

    fn reset(text: &str) -> Payload {
        Payload::reset(1, 0, vec![Action::insert(0, text)])
    }

    #[test]
    fn test_lazy_creation() {
        let mut registry: DecoderRegistry<String> = DecoderRegistry::with_playback(false);
        assert!(registry.is_empty());
        assert!(registry.get(&"alice".to_string()).is_none());

        registry.decode(&"alice".to_string(), &reset("hi"));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(&"alice".to_string()).unwrap().text(), "hi");
    }

    #[test]
    fn test_authors_are_independent() {
        let mut registry = DecoderRegistry::with_playback(false);
        registry.decode(&"alice", &reset("one"));
        registry.decode(&"bob", &reset("two"));
        registry.decode(&"bob", &Payload::edit(5, 0, vec![Action::insert(0, "x")]));

        assert!(registry.get(&"alice").unwrap().in_sync());
        assert_eq!(registry.get(&"bob").unwrap().status(), SyncStatus::Desynced);
    }

    #[test]
    fn test_creation_order() {
        let mut registry = DecoderRegistry::with_playback(false);
        for author in ["carol", "alice", "bob"] {
            registry.decode(&author, &reset(author));
        }
        registry.remove(&"alice");

        let authors: Vec<_> = registry.iter().map(|(k, _)| *k).collect();
        assert_eq!(authors, vec!["carol", "bob"]);

        registry.clear();
        assert!(registry.is_empty());
        assert_eq!(registry.iter().count(), 0);
    }

    #[test]
    fn test_playback_across_decoders() {
        let t0 = Instant::now();
        let mut registry = DecoderRegistry::new();
        let staged = Payload::reset(1, 0, vec![Action::wait(80), Action::insert(0, "a")]);
        registry.decode_at(&1u8, &staged, t0);
        let staged = Payload::reset(1, 0, vec![Action::wait(40), Action::insert(0, "b")]);
        registry.decode_at(&2u8, &staged, t0);

        assert_eq!(registry.next_release(), Some(t0 + Duration::from_millis(40)));
        assert!(registry.release_due(t0 + Duration::from_millis(40)));
        assert_eq!(registry.get(&2).unwrap().text(), "b");
        assert_eq!(registry.get(&1).unwrap().text(), "");

        assert!(registry.full_decode_now());
        assert_eq!(registry.get(&1).unwrap().text(), "a");
        assert_eq!(registry.next_release(), None);
    }

    #[test]
    fn test_set_playback_propagates() {
        let t0 = Instant::now();
        let mut registry = DecoderRegistry::new();
        registry.decode_at(&"a", &Payload::reset(1, 0, vec![Action::wait(50), Action::insert(0, "z")]), t0);

        assert!(registry.set_playback(false));
        assert_eq!(registry.get(&"a").unwrap().text(), "z");

        registry.decode(&"b", &reset("y"));
        assert!(!registry.get(&"b").unwrap().playback());
    }
}
