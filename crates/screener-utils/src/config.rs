//! Runtime configuration shared by all binaries

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Errors raised while reading runtime configuration
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A value could not be parsed
    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human readable, one event per line
    #[default]
    Pretty,
    /// Newline-delimited JSON
    Json,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pretty" | "text" | "" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::InvalidValue {
                key: "LOG_FORMAT".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application name, logged once tracing is up
    pub app_name: String,
    /// Default filter directive when `RUST_LOG` is unset
    pub log_filter: String,
    /// Log output format
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_name: "stock-bot".to_string(),
            log_filter: "warn,stock_screener=info,stock_bot=info".to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}

impl Config {
    /// Read `LOG_FORMAT` from the environment on top of the defaults
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Ok(format) = std::env::var("LOG_FORMAT") {
            config.log_format = format.parse()?;
        }
        Ok(config)
    }
}
