//! Diff engine
//!
//! Turns two consecutive snapshots of a text buffer into at most one
//! `Erase` followed by at most one `Insert`.
//!
//! The longest common prefix is found first, then the longest common suffix
//! of what remains. The middle of the old text is erased and the middle of
//! the new text is inserted. This is linear in the text length and exact for
//! the single contiguous edits that consecutive keystrokes produce.
//!
//! When the edited region can slide (typing `a` into `aa`), the caret
//! position picks where it lands. The number and size of the emitted actions
//! never change because of the caret.

use super::action::Action;

/// A buffer state: text plus caret, in `char` units.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    /// Buffer text.
    pub text: String,
    /// Caret position.
    pub cursor: usize,
}

impl Snapshot {
    /// Create a snapshot.
    pub fn new(text: impl Into<String>, cursor: usize) -> Self {
        Self {
            text: text.into(),
            cursor,
        }
    }

    /// The empty buffer.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Check whether the text is empty.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Compute the actions that transform `previous.text` into `current.text`.
///
/// Returns an empty vector when the texts are equal; caret-only moves are
/// not encoded.
pub fn diff(previous: &Snapshot, current: &Snapshot) -> Vec<Action> {
    if previous.text == current.text {
        return Vec::new();
    }

    let old: Vec<char> = previous.text.chars().collect();
    let new: Vec<char> = current.text.chars().collect();
    let shortest = old.len().min(new.len());

    let prefix = old.iter().zip(&new).take_while(|(a, b)| a == b).count();

    // Suffix may not overlap the prefix in either text.
    let suffix_limit = shortest - prefix;
    let suffix = old
        .iter()
        .rev()
        .zip(new.iter().rev())
        .take(suffix_limit)
        .take_while(|(a, b)| a == b)
        .count();

    let (prefix, suffix) = align_to_cursor(&old, &new, prefix, suffix, current.cursor);

    let erased = old.len() - suffix - prefix;
    let inserted = &new[prefix..new.len() - suffix];

    let mut actions = Vec::with_capacity(2);
    if erased > 0 {
        actions.push(Action::erase(prefix, erased));
    }
    if !inserted.is_empty() {
        actions.push(Action::insert(prefix, inserted.iter().collect::<String>()));
    }
    actions
}

/// Slide the edited region towards the caret when the texts allow it.
///
/// Shifting left by `k` is valid while the `k` chars before each middle
/// region also appear at the end of both middles, i.e. while the full common
/// suffix extends `k` past the limited one.
fn align_to_cursor(
    old: &[char],
    new: &[char],
    prefix: usize,
    suffix: usize,
    cursor: usize,
) -> (usize, usize) {
    let full_suffix = old
        .iter()
        .rev()
        .zip(new.iter().rev())
        .take_while(|(a, b)| a == b)
        .count();
    let max_shift = prefix.min(full_suffix - suffix);
    if max_shift == 0 {
        return (prefix, suffix);
    }

    let inserted = new.len() - suffix - prefix;
    let desired = cursor.saturating_sub(inserted);
    let start = desired.clamp(prefix - max_shift, prefix);
    let shift = prefix - start;
    (start, suffix + shift)
}

/// Apply a list of actions to a string. `Wait` actions are ignored.
pub fn apply(text: &str, actions: &[Action]) -> String {
    let mut out = text.to_string();
    for action in actions {
        action.apply_to(&mut out);
    }
    out
}
