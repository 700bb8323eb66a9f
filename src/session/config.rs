//! Real-time text settings
//!
//! The settings a chat front end exposes to its user, plus the named
//! presets offered in its settings menu.

use serde::{Deserialize, Serialize};

use crate::core::{
    ConfigError, DEFAULT_EMBED_DELAYS, DEFAULT_FLUSH_INTERVAL_MS, ENV_EMBED_DELAYS, ENV_ENABLED,
    ENV_FLUSH_INTERVAL_MS, ENV_SHOW_REMOTE_CURSOR, is_allowed_flush_interval,
};

/// User-facing real-time text settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RttConfig {
    /// Interval between transmissions; `0` sends on every change.
    pub flush_interval_ms: u32,
    /// Embed key press intervals as `Wait` actions and play them back.
    pub embed_delays: bool,
    /// When false, only final message text is exchanged.
    pub rtt_enabled: bool,
    /// Render a marker at the remote author's caret.
    pub show_remote_cursor: bool,
}

impl Default for RttConfig {
    fn default() -> Self {
        Self {
            flush_interval_ms: DEFAULT_FLUSH_INTERVAL_MS,
            embed_delays: DEFAULT_EMBED_DELAYS,
            rtt_enabled: true,
            show_remote_cursor: true,
        }
    }
}

/// Named combinations of pacing settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Preset {
    /// One second transmissions with natural typing playback.
    Recommended,
    /// Half second transmissions with natural typing playback.
    LowLag,
    /// Every change sent at once, no playback. Floods servers.
    ImmediateTransmit,
    /// One second bursts with no playback and no remote cursor.
    BurstyText,
}

impl Preset {
    /// All presets, in menu order.
    pub const ALL: [Preset; 4] = [
        Preset::Recommended,
        Preset::LowLag,
        Preset::ImmediateTransmit,
        Preset::BurstyText,
    ];

    fn settings(self) -> (u32, bool, bool) {
        match self {
            Preset::Recommended => (1000, true, true),
            Preset::LowLag => (500, true, true),
            Preset::ImmediateTransmit => (0, false, true),
            Preset::BurstyText => (1000, false, false),
        }
    }
}

impl RttConfig {
    /// Settings for a preset, with real-time text enabled.
    pub fn from_preset(preset: Preset) -> Self {
        let mut config = Self::default();
        config.apply_preset(preset);
        config
    }

    /// Overwrite pacing and cursor settings with a preset's.
    pub fn apply_preset(&mut self, preset: Preset) {
        let (interval, delays, cursor) = preset.settings();
        self.flush_interval_ms = interval;
        self.embed_delays = delays;
        self.show_remote_cursor = cursor;
    }

    /// The preset these settings match, if any.
    pub fn preset(&self) -> Option<Preset> {
        Preset::ALL.into_iter().find(|p| {
            let (interval, delays, cursor) = p.settings();
            self.flush_interval_ms == interval
                && self.embed_delays == delays
                && self.show_remote_cursor == cursor
        })
    }

    /// Check that the flush interval is selectable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_allowed_flush_interval(self.flush_interval_ms) {
            return Err(ConfigError::UnsupportedFlushInterval(self.flush_interval_ms));
        }
        Ok(())
    }

    /// Defaults overlaid with `RTT_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overlaid with values from `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_FLUSH_INTERVAL_MS) {
            config.flush_interval_ms = raw.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                key: ENV_FLUSH_INTERVAL_MS,
                value: raw.clone(),
            })?;
        }
        if let Some(raw) = lookup(ENV_EMBED_DELAYS) {
            config.embed_delays = parse_flag(ENV_EMBED_DELAYS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_ENABLED) {
            config.rtt_enabled = parse_flag(ENV_ENABLED, &raw)?;
        }
        if let Some(raw) = lookup(ENV_SHOW_REMOTE_CURSOR) {
            config.show_remote_cursor = parse_flag(ENV_SHOW_REMOTE_CURSOR, &raw)?;
        }

        config.validate()?;
        Ok(config)
    }
}

fn parse_flag(key: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidEnv {
            key,
            value: raw.to_string(),
        }),
    }
}
