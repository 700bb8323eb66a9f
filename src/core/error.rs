//! Error types for the real-time text codec.
//!
//! Malformed actions and sequence gaps are not errors: the decoder clamps
//! and reports sync status instead. Errors only surface where a caller hands
//! the codec bytes or settings it cannot interpret.

use thiserror::Error;

/// Errors decoding a wire element or envelope.
#[derive(Debug, Error)]
pub enum WireError {
    /// Input was not a valid element (bad JSON, unknown `op` or `event`,
    /// negative or overflowing numbers).
    #[error("malformed rtt element: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Errors in caller supplied configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Flush interval is not one of the selectable values.
    #[error("unsupported flush interval {0} ms")]
    UnsupportedFlushInterval(u32),

    /// Environment variable could not be parsed.
    #[error("invalid value {value:?} for {key}")]
    InvalidEnv {
        /// Variable name.
        key: &'static str,
        /// Raw value found.
        value: String,
    },
}

/// Top-level codec errors.
#[derive(Debug, Error)]
pub enum RttError {
    /// Wire error.
    #[error("wire error: {0}")]
    Wire(#[from] WireError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::UnsupportedFlushInterval(42);
        assert_eq!(err.to_string(), "unsupported flush interval 42 ms");

        let err = ConfigError::InvalidEnv {
            key: "RTT_ENABLED",
            value: "maybe".to_string(),
        };
        assert_eq!(err.to_string(), "invalid value \"maybe\" for RTT_ENABLED");
    }

    #[test]
    fn test_top_level_conversion() {
        let err: RttError = ConfigError::UnsupportedFlushInterval(7).into();
        assert!(matches!(err, RttError::Config(_)));

        let json_err = serde_json::from_str::<u32>("nope").unwrap_err();
        let err: RttError = WireError::from(json_err).into();
        assert!(err.to_string().starts_with("wire error: malformed rtt element"));
    }
}
