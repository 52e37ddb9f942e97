use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::error::ConfigError;

fn default_max_parallel() -> usize { 4 }
fn default_timeout_ms() -> u64 { 10_000 }

/// Construction-time configuration of a [`PluginLoader`](super::PluginLoader).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Reserved. Accepted and carried, no effect on loading.
    #[serde(default)]
    pub preload: bool,
    /// Group size for batch loads.
    #[serde(default = "default_max_parallel")]
    pub max_parallel: usize,
    /// Per-load deadline in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            preload: false,
            max_parallel: default_max_parallel(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

/// Supported configuration text formats.
#[derive(Debug, Clone, Copy)]
pub enum ConfigFormat {
    Yaml,
    Json,
    Toml,
}

impl LoaderConfig {
    /// Parses and validates configuration text.
    pub fn parse(content: &str, format: ConfigFormat) -> Result<Self, ConfigError> {
        let config: Self = match format {
            ConfigFormat::Yaml => serde_saphyr::from_str(content)
                .map_err(|e| ConfigError::Parse(e.to_string()))?,
            ConfigFormat::Json => serde_json::from_str(content)
                .map_err(|e| ConfigError::Parse(e.to_string()))?,
            ConfigFormat::Toml => toml::from_str(content)
                .map_err(|e| ConfigError::Parse(e.to_string()))?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_parallel == 0 {
            return Err(ConfigError::ZeroMaxParallel);
        }
        if self.timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}
