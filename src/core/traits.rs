//! Core traits for real-time text.
//!
//! These traits define the interface decoded edits are applied through.

/// A text buffer edited in Unicode scalar value units.
///
/// All positions and counts are `char` indices, never byte offsets. The
/// decoder reconstructs into a [`String`], but a presentation layer can
/// implement this for its own text model and replay actions directly.
///
/// # Requirements
///
/// - `insert_units` and `erase_units` are only called with in-range
///   arguments; clamping happens before the call via
///   [`clamp_insert`](EditTarget::clamp_insert) and
///   [`clamp_erase`](EditTarget::clamp_erase)
/// - `len_units` MUST reflect every prior edit
pub trait EditTarget {
    /// Length in `char` units.
    fn len_units(&self) -> usize;

    /// Insert `text` before the unit at `position`.
    fn insert_units(&mut self, position: usize, text: &str);

    /// Remove `count` units starting at `position`.
    fn erase_units(&mut self, position: usize, count: usize);

    /// Clamp an insert position into `0..=len`.
    fn clamp_insert(&self, position: usize) -> usize {
        position.min(self.len_units())
    }

    /// Clamp an erase range so it lies inside the buffer.
    fn clamp_erase(&self, position: usize, count: usize) -> (usize, usize) {
        let len = self.len_units();
        let position = position.min(len);
        (position, count.min(len - position))
    }
}

/// Byte offset of the `index`-th char, or `text.len()` past the end.
pub(crate) fn byte_offset(text: &str, index: usize) -> usize {
    text.char_indices()
        .nth(index)
        .map_or(text.len(), |(offset, _)| offset)
}

impl EditTarget for String {
    fn len_units(&self) -> usize {
        self.chars().count()
    }

    fn insert_units(&mut self, position: usize, text: &str) {
        let at = byte_offset(self, position);
        self.insert_str(at, text);
    }

    fn erase_units(&mut self, position: usize, count: usize) {
        let start = byte_offset(self, position);
        let end = start + byte_offset(&self[start..], count);
        self.replace_range(start..end, "");
    }
}
