//! Configuration data structures for archflow.
//!
//! Defines the YAML config format: playback timing, display defaults, search
//! behaviour and log filtering. Every field has a default so partial files
//! load cleanly.

use serde::{Deserialize, Serialize};

use crate::graph::search::SearchMode;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Root configuration for archflow.
///
/// Loaded from a YAML file; see [`crate::config::load`] for lookup order and
/// environment overrides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchFlowConfig {
    /// Config format version (currently "1.0").
    #[serde(default = "default_version")]
    pub version: String,

    #[serde(default)]
    pub playback: PlaybackConfig,

    #[serde(default)]
    pub display: DisplayConfig,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for ArchFlowConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            playback: PlaybackConfig::default(),
            display: DisplayConfig::default(),
            search: SearchConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl ArchFlowConfig {
    /// Per-round playback duration.
    pub fn round_duration(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.playback.round_duration_ms)
    }
}

// ---------------------------------------------------------------------------
// PlaybackConfig
// ---------------------------------------------------------------------------

/// Timed reveal of flow chains.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// Duration of one propagation round in milliseconds.
    #[serde(default = "default_round_duration_ms")]
    pub round_duration_ms: u64,

    /// Start playback automatically after each flow selection.
    #[serde(default)]
    pub autoplay: bool,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            round_duration_ms: default_round_duration_ms(),
            autoplay: false,
        }
    }
}

// ---------------------------------------------------------------------------
// DisplayConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Interaction mode a new session starts in.
    #[serde(default)]
    pub default_mode: DisplayMode,
}

/// How a node selection is interpreted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    /// Selecting a node highlights its ancestors and descendants.
    #[default]
    Highlight,
    /// Selecting a node starts a gated flow from it.
    Flow,
}

impl DisplayMode {
    /// Parse from a loose string (case-insensitive).
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "highlight" | "chain" => Some(Self::Highlight),
            "flow" => Some(Self::Flow),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Highlight => "highlight",
            Self::Flow => "flow",
        }
    }
}

impl std::fmt::Display for DisplayMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// SearchConfig / LoggingConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default)]
    pub mode: SearchMode,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `tracing` filter directive, e.g. `archflow=debug`. `RUST_LOG` wins
    /// when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

fn default_version() -> String {
    "1.0".to_string()
}

fn default_round_duration_ms() -> u64 {
    500
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
