//! Core configuration types and loading.

use super::defaults::{
    default_allowed_lateness_secs, default_delimiter, default_state_path,
    default_tick_interval_ms,
};
use serde::Deserialize;
use std::io::ErrorKind;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Bot configuration. Every section and key is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub bot: BotConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub state: StateConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// A missing file yields the defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = match std::fs::read_to_string(path.as_ref()) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::info!(path = %path.as_ref().display(), "No config file, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(e.into()),
        };
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    /// Delimiter for chats that haven't set their own.
    #[serde(default = "default_delimiter")]
    pub default_delimiter: String,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            default_delimiter: default_delimiter(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    /// Scheduler loop period in milliseconds.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    /// How late a scheduled command may fire before it is dropped.
    #[serde(default = "default_allowed_lateness_secs")]
    pub allowed_lateness_secs: u64,
}

impl SchedulerConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn allowed_lateness(&self) -> chrono::Duration {
        chrono::Duration::seconds(i64::try_from(self.allowed_lateness_secs).unwrap_or(i64::MAX / 1000))
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            allowed_lateness_secs: default_allowed_lateness_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StateConfig {
    /// JSON file holding persisted bot state.
    #[serde(default = "default_state_path")]
    pub path: String,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            path: default_state_path(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.bot.default_delimiter, "!");
        assert_eq!(config.scheduler.tick_interval(), Duration::from_secs(1));
        assert_eq!(config.scheduler.allowed_lateness(), chrono::Duration::seconds(30));
        assert_eq!(config.state.path, "convergence.json");
    }

    #[test]
    fn test_partial_sections() {
        let config: Config = toml::from_str(
            r#"
            [bot]
            default_delimiter = "?"

            [scheduler]
            allowed_lateness_secs = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.bot.default_delimiter, "?");
        assert_eq!(config.scheduler.tick_interval_ms, 1000);
        assert_eq!(config.scheduler.allowed_lateness_secs, 5);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path().join("none.toml")).unwrap();
        assert_eq!(config.state.path, "convergence.json");
    }

    #[test]
    fn test_load_rejects_bad_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[bot\n").unwrap();
        assert!(matches!(Config::load(&path), Err(ConfigError::Parse(_))));
    }
}
