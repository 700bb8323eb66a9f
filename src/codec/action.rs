//! Edit actions
//!
//! The atomic unit carried inside a payload. Field names on the wire follow
//! the `rtt` element schema (`op`, `pos`, `text`, `count`, `ms`).

use serde::{Deserialize, Serialize};

use crate::core::EditTarget;

/// A single edit or pacing marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum Action {
    /// Insert `text` at `position`.
    Insert {
        /// Insertion point in `char` units.
        #[serde(rename = "pos")]
        position: usize,
        /// Inserted text.
        text: String,
    },
    /// Remove `count` units starting at `position`.
    Erase {
        /// First erased unit.
        #[serde(rename = "pos")]
        position: usize,
        /// Number of erased units.
        count: usize,
    },
    /// Pause before the next action. Never mutates the buffer.
    Wait {
        /// Pause length.
        #[serde(rename = "ms")]
        milliseconds: u32,
    },
}

/// What applying one action did to the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// Buffer changed; `cursor` is where the remote caret now sits.
    Edited {
        /// Caret position after the edit.
        cursor: usize,
        /// Whether position or count had to be clamped.
        clamped: bool,
    },
    /// Nothing to do (empty insert, zero-length erase).
    Unchanged,
    /// A pacing hint; the caller decides whether to honour it.
    Wait(u32),
}

impl Action {
    /// Create an insert action.
    pub fn insert(position: usize, text: impl Into<String>) -> Self {
        Self::Insert {
            position,
            text: text.into(),
        }
    }

    /// Create an erase action.
    pub fn erase(position: usize, count: usize) -> Self {
        Self::Erase { position, count }
    }

    /// Create a wait action.
    pub fn wait(milliseconds: u32) -> Self {
        Self::Wait { milliseconds }
    }

    /// Check whether this action edits text (as opposed to pacing).
    pub fn is_edit(&self) -> bool {
        !matches!(self, Self::Wait { .. })
    }

    /// Apply to a target, clamping out-of-range arguments.
    pub fn apply_to<T: EditTarget + ?Sized>(&self, target: &mut T) -> Applied {
        match self {
            Self::Insert { position, text } => {
                let at = target.clamp_insert(*position);
                if text.is_empty() {
                    return Applied::Unchanged;
                }
                target.insert_units(at, text);
                Applied::Edited {
                    cursor: at + text.chars().count(),
                    clamped: at != *position,
                }
            }
            Self::Erase { position, count } => {
                let (at, n) = target.clamp_erase(*position, *count);
                if n == 0 {
                    return Applied::Unchanged;
                }
                target.erase_units(at, n);
                Applied::Edited {
                    cursor: at,
                    clamped: at != *position || n != *count,
                }
            }
            Self::Wait { milliseconds } => Applied::Wait(*milliseconds),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_insert() {
        let mut buf = String::from("hlo");
        let applied = Action::insert(1, "el").apply_to(&mut buf);

        assert_eq!(buf, "hello");
        assert_eq!(applied, Applied::Edited { cursor: 3, clamped: false });
    }

    #[test]
    fn test_apply_erase() {
        let mut buf = String::from("hello");
        let applied = Action::erase(3, 1).apply_to(&mut buf);

        assert_eq!(buf, "helo");
        assert_eq!(applied, Applied::Edited { cursor: 3, clamped: false });
    }

    #[test]
    fn test_out_of_range_is_clamped() {
        let mut buf = String::from("abc");
        let applied = Action::insert(99, "d").apply_to(&mut buf);
        assert_eq!(buf, "abcd");
        assert_eq!(applied, Applied::Edited { cursor: 4, clamped: true });

        let applied = Action::erase(2, 50).apply_to(&mut buf);
        assert_eq!(buf, "ab");
        assert_eq!(applied, Applied::Edited { cursor: 2, clamped: true });

        let applied = Action::erase(10, 1).apply_to(&mut buf);
        assert_eq!(buf, "ab");
        assert_eq!(applied, Applied::Unchanged);
    }

    #[test]
    fn test_wait_does_not_mutate() {
        let mut buf = String::from("abc");
        assert_eq!(Action::wait(120).apply_to(&mut buf), Applied::Wait(120));
        assert_eq!(buf, "abc");
        assert!(!Action::wait(1).is_edit());
        assert!(Action::erase(0, 1).is_edit());
    }

    #[test]
    fn test_wire_shape() {
        let json = serde_json::to_string(&Action::insert(2, "hi")).unwrap();
        assert_eq!(json, r#"{"op":"insert","pos":2,"text":"hi"}"#);

        let json = serde_json::to_string(&Action::erase(0, 3)).unwrap();
        assert_eq!(json, r#"{"op":"erase","pos":0,"count":3}"#);

        let json = serde_json::to_string(&Action::wait(250)).unwrap();
        assert_eq!(json, r#"{"op":"wait","ms":250}"#);
    }

    #[test]
    fn test_negative_count_rejected_on_wire() {
        let result = serde_json::from_str::<Action>(r#"{"op":"erase","pos":0,"count":-1}"#);
        assert!(result.is_err());
    }
}
