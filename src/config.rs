//! Configuration management for ScroogeCoin

use crate::error::ChainError;
use crate::transaction::ValidationPolicy;
use serde::Deserialize;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub handler: HandlerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Settings for one epoch resolution pass.
#[derive(Debug, Clone, Deserialize)]
pub struct HandlerConfig {
    #[serde(default = "default_allow_empty_inputs")]
    pub allow_empty_inputs: bool,
    /// Check candidates on the rayon pool. Selection and outcome are the same
    /// as the sequential scan.
    #[serde(default)]
    pub parallel_scan: bool,
    /// Optional cap on batch size; candidates past it are not examined.
    /// Unset means every candidate is considered.
    #[serde(default)]
    pub max_candidates: Option<usize>,
}

impl HandlerConfig {
    pub fn policy(&self) -> ValidationPolicy {
        ValidationPolicy {
            allow_empty_inputs: self.allow_empty_inputs,
        }
    }
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            allow_empty_inputs: default_allow_empty_inputs(),
            parallel_scan: false,
            max_candidates: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_allow_empty_inputs() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Load configuration from `path`, falling back to defaults when the file is absent.
pub fn load_config(path: impl AsRef<Path>) -> Result<Config, ChainError> {
    let path = path.as_ref();
    let config: Config = match fs::read_to_string(path) {
        Ok(config_str) => toml::from_str(&config_str)?,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::debug!("{} not found, using default configuration", path.display());
            Config::default()
        }
        Err(e) => return Err(e.into()),
    };

    if config.handler.max_candidates == Some(0) {
        return Err(ChainError::ConfigError(
            "handler.max_candidates must be greater than zero".to_string(),
        ));
    }

    if config.logging.level.trim().is_empty() {
        return Err(ChainError::ConfigError(
            "logging.level must not be empty".to_string(),
        ));
    }

    Ok(config)
}
