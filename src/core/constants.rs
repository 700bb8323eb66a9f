//! Protocol constants for real-time text.
//!
//! Defaults are the recommended real-time text settings.

use std::time::Duration;

// =============================================================================
// PACING
// =============================================================================

/// Recommended flush interval between transmissions.
pub const DEFAULT_FLUSH_INTERVAL_MS: u32 = 1000;

/// Flush intervals a caller may select. `0` means "flush on every change".
pub const ALLOWED_FLUSH_INTERVALS_MS: [u32; 11] =
    [0, 20, 50, 100, 200, 300, 500, 1000, 2000, 3000, 5000];

/// Check whether `ms` is one of [`ALLOWED_FLUSH_INTERVALS_MS`].
pub fn is_allowed_flush_interval(ms: u32) -> bool {
    ALLOWED_FLUSH_INTERVALS_MS.contains(&ms)
}

/// Timer floor used when the flush interval is `0`.
pub const IMMEDIATE_FLUSH_FLOOR: Duration = Duration::from_millis(1);

/// Embedded key press intervals are generated by default.
pub const DEFAULT_EMBED_DELAYS: bool = true;

/// Largest `Wait` the encoder will embed between two edits.
pub const MAX_WAIT_MS: u32 = 5000;

// =============================================================================
// DECODER
// =============================================================================

/// Payloads held while desynchronized, waiting for the missing one.
pub const MAX_HELD_PAYLOADS: usize = 64;

// =============================================================================
// PRESENTATION
// =============================================================================

/// Marker spliced into rendered remote text at the remote cursor.
pub const CURSOR_CHAR: char = '\u{258C}';

// =============================================================================
// ENVIRONMENT (configuration overlay)
// =============================================================================

/// Flush interval override.
pub const ENV_FLUSH_INTERVAL_MS: &str = "RTT_FLUSH_INTERVAL_MS";

/// Embedded delays override.
pub const ENV_EMBED_DELAYS: &str = "RTT_EMBED_DELAYS";

/// Real-time text master switch.
pub const ENV_ENABLED: &str = "RTT_ENABLED";

/// Remote cursor rendering override.
pub const ENV_SHOW_REMOTE_CURSOR: &str = "RTT_SHOW_REMOTE_CURSOR";
