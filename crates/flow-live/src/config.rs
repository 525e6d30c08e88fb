use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// Live loop configuration.
///
/// Loaded from an optional TOML file, then overridden by `FLOW_*`
/// environment variables.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LiveConfig {
    /// Delay between samples of the keypoint source, in milliseconds.
    pub sample_interval_ms: u64,
    /// How long `stop()` waits for an in-flight sample before aborting it.
    pub stop_grace_ms: u64,
    /// Consecutive not-ready samples before the source is reported stalled.
    pub unavailable_warn_after: u32,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            sample_interval_ms: 120,
            stop_grace_ms: 150,
            unavailable_warn_after: 20,
        }
    }
}

impl LiveConfig {
    /// Defaults overridden by `FLOW_*` environment variables.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Parse a TOML file, then apply environment overrides.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let display = path.display().to_string();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: display.clone(),
            source,
        })?;
        let config = Self::from_toml_str(&text).map_err(|source| ConfigError::Parse {
            path: display,
            source,
        })?;
        Ok(config.with_env_overrides())
    }

    /// Parse TOML text. Missing keys keep their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    fn with_env_overrides(self) -> Self {
        Self {
            sample_interval_ms: env_u64("FLOW_SAMPLE_INTERVAL_MS", self.sample_interval_ms),
            stop_grace_ms: env_u64("FLOW_STOP_GRACE_MS", self.stop_grace_ms),
            unavailable_warn_after: env_u32(
                "FLOW_UNAVAILABLE_WARN_AFTER",
                self.unavailable_warn_after,
            ),
        }
    }

    /// Sampling period, never shorter than 1 ms.
    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms.max(1))
    }

    pub fn stop_grace(&self) -> Duration {
        Duration::from_millis(self.stop_grace_ms)
    }
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
