//! Configuration loading.
//!
//! Lookup order for the config file:
//!
//! 1. an explicit path (the `--config` flag),
//! 2. the `ARCHFLOW_CONFIG` environment variable,
//! 3. `archflow.yaml` in the platform config directory,
//! 4. built-in defaults.
//!
//! An explicitly named file that is missing is an error; a missing file in
//! the platform directory is not. `ARCHFLOW_ROUND_MS` then overrides the
//! playback round duration.

pub mod schema;

use std::path::{Path, PathBuf};

use crate::error::{ArchFlowError, Result};

pub use schema::{ArchFlowConfig, DisplayMode};

/// Environment variable naming a config file.
pub const CONFIG_ENV: &str = "ARCHFLOW_CONFIG";

/// Environment variable overriding `playback.round_duration_ms`.
pub const ROUND_MS_ENV: &str = "ARCHFLOW_ROUND_MS";

/// Config file name inside the platform config directory.
pub const CONFIG_FILE_NAME: &str = "archflow.yaml";

/// Load configuration from the process environment.
pub fn load(explicit: Option<&Path>) -> Result<ArchFlowConfig> {
    load_with(explicit, |key| std::env::var(key).ok(), user_config_path())
}

/// Load configuration with an injectable environment lookup and user config
/// path.
pub fn load_with(
    explicit: Option<&Path>,
    env: impl Fn(&str) -> Option<String>,
    user_path: Option<PathBuf>,
) -> Result<ArchFlowConfig> {
    let from_env = env(CONFIG_ENV).filter(|v| !v.trim().is_empty()).map(PathBuf::from);

    let mut config = match (explicit, from_env) {
        (Some(path), _) => load_from(path)?,
        (None, Some(path)) => load_from(&path)?,
        (None, None) => match user_path.filter(|p| p.is_file()) {
            Some(path) => load_from(&path)?,
            None => {
                tracing::debug!("no config file found, using defaults");
                ArchFlowConfig::default()
            }
        },
    };

    apply_env_overrides(&mut config, env)?;
    Ok(config)
}

/// Parse one YAML config file.
pub fn load_from(path: &Path) -> Result<ArchFlowConfig> {
    if !path.is_file() {
        return Err(ArchFlowError::Config(format!(
            "config file not found: {}",
            path.display()
        )));
    }
    let contents = std::fs::read_to_string(path)?;
    let config: ArchFlowConfig = serde_yaml::from_str(&contents).map_err(|e| {
        ArchFlowError::Config(format!("failed to parse {}: {e}", path.display()))
    })?;
    tracing::debug!(path = %path.display(), "config loaded");
    Ok(config)
}

/// Apply environment overrides on top of a loaded config.
pub fn apply_env_overrides(
    config: &mut ArchFlowConfig,
    env: impl Fn(&str) -> Option<String>,
) -> Result<()> {
    if let Some(raw) = env(ROUND_MS_ENV) {
        let ms: u64 = raw.trim().parse().map_err(|_| {
            ArchFlowError::Config(format!("{ROUND_MS_ENV} must be a whole number of milliseconds, got '{raw}'"))
        })?;
        config.playback.round_duration_ms = ms;
    }
    Ok(())
}

/// `archflow.yaml` inside the platform config directory.
pub fn user_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "archflow")
        .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
