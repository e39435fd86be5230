//! Configuration for screening operations

use crate::error::{Result, StockError};
use crate::screener::FilterCriteria;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Lookback ranges accepted for price history
pub const HISTORY_RANGES: &[&str] = &["5d", "1mo", "3mo", "6mo", "1y"];

/// Configuration for a screening run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenerConfig {
    /// NSE index whose constituents form the symbol universe
    pub index_name: String,

    /// Suffix NSE symbols carry on Yahoo Finance
    pub market_suffix: String,

    /// Suffix of the fallback exchange (BSE)
    pub alternate_suffix: String,

    /// Symbols evaluated per batch
    pub batch_size: usize,

    /// Concurrent filter evaluations
    pub pool_width: usize,

    /// Result count returned when the caller does not ask for one
    pub default_limit: usize,

    /// Collection stops once `limit * overcollect_factor` candidates are in
    pub overcollect_factor: usize,

    /// Lookback range for volatility history
    pub history_range: String,

    /// Attempts for each history fetch
    pub history_attempts: u32,

    /// Fixed pause between history attempts
    pub retry_delay: Duration,

    /// Timeout applied to every quote and history request
    pub request_timeout: Duration,

    /// Yahoo Finance requests allowed per second across all workers
    pub yahoo_requests_per_second: u32,

    /// Admission thresholds
    pub criteria: FilterCriteria,
}

impl Default for ScreenerConfig {
    fn default() -> Self {
        Self {
            index_name: "NIFTY TOTAL MARKET".to_string(),
            market_suffix: ".NS".to_string(),
            alternate_suffix: ".BO".to_string(),
            batch_size: 50,
            pool_width: 8,
            default_limit: 10,
            overcollect_factor: 3,
            history_range: "1mo".to_string(),
            history_attempts: 3,
            retry_delay: Duration::from_secs(1),
            request_timeout: Duration::from_secs(10),
            yahoo_requests_per_second: 20,
            criteria: FilterCriteria::default(),
        }
    }
}

impl ScreenerConfig {
    /// Create a new configuration builder
    pub fn builder() -> ScreenerConfigBuilder {
        ScreenerConfigBuilder::default()
    }

    /// Defaults overridden by `SCREENER_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::builder().with_env().build()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(StockError::ConfigError(
                "batch_size must be greater than 0".to_string(),
            ));
        }

        if self.pool_width == 0 {
            return Err(StockError::ConfigError(
                "pool_width must be greater than 0".to_string(),
            ));
        }

        if self.default_limit == 0 || self.overcollect_factor == 0 {
            return Err(StockError::ConfigError(
                "default_limit and overcollect_factor must be greater than 0".to_string(),
            ));
        }

        if self.history_attempts == 0 {
            return Err(StockError::ConfigError(
                "history_attempts must be greater than 0".to_string(),
            ));
        }

        if self.yahoo_requests_per_second == 0 {
            return Err(StockError::ConfigError(
                "yahoo_requests_per_second must be greater than 0".to_string(),
            ));
        }

        if !HISTORY_RANGES.contains(&self.history_range.as_str()) {
            return Err(StockError::ConfigError(format!(
                "history_range must be one of {HISTORY_RANGES:?}, got {}",
                self.history_range
            )));
        }

        Ok(())
    }

    /// Candidate count at which batch issuing stops
    pub fn collection_target(&self, limit: usize) -> usize {
        limit.saturating_mul(self.overcollect_factor)
    }
}

/// Builder for ScreenerConfig
#[derive(Debug, Default)]
pub struct ScreenerConfigBuilder {
    index_name: Option<String>,
    batch_size: Option<usize>,
    pool_width: Option<usize>,
    default_limit: Option<usize>,
    history_range: Option<String>,
    history_attempts: Option<u32>,
    retry_delay: Option<Duration>,
    request_timeout: Option<Duration>,
    yahoo_requests_per_second: Option<u32>,
    criteria: Option<FilterCriteria>,
}

impl ScreenerConfigBuilder {
    /// Set the NSE index name
    pub fn index_name(mut self, name: impl Into<String>) -> Self {
        self.index_name = Some(name.into());
        self
    }

    /// Set the batch size
    pub fn batch_size(mut self, size: usize) -> Self {
        self.batch_size = Some(size);
        self
    }

    /// Set the worker pool width
    pub fn pool_width(mut self, width: usize) -> Self {
        self.pool_width = Some(width);
        self
    }

    /// Set the default result limit
    pub fn default_limit(mut self, limit: usize) -> Self {
        self.default_limit = Some(limit);
        self
    }

    /// Set the history lookback range
    pub fn history_range(mut self, range: impl Into<String>) -> Self {
        self.history_range = Some(range.into());
        self
    }

    /// Set history fetch attempts
    pub fn history_attempts(mut self, attempts: u32) -> Self {
        self.history_attempts = Some(attempts);
        self
    }

    /// Set the pause between history attempts
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = Some(delay);
        self
    }

    /// Set request timeout
    pub fn request_timeout(mut self, duration: Duration) -> Self {
        self.request_timeout = Some(duration);
        self
    }

    /// Set the Yahoo Finance request rate
    pub fn yahoo_requests_per_second(mut self, rate: u32) -> Self {
        self.yahoo_requests_per_second = Some(rate);
        self
    }

    /// Set admission thresholds
    pub fn criteria(mut self, criteria: FilterCriteria) -> Self {
        self.criteria = Some(criteria);
        self
    }

    /// Load overrides from `SCREENER_*` environment variables
    ///
    /// Unparseable values are ignored with a warning.
    pub fn with_env(mut self) -> Self {
        if let Ok(index) = std::env::var("SCREENER_INDEX") {
            self.index_name = Some(index);
        }
        if let Some(size) = env_parse("SCREENER_BATCH_SIZE") {
            self.batch_size = Some(size);
        }
        if let Some(width) = env_parse("SCREENER_POOL_WIDTH") {
            self.pool_width = Some(width);
        }
        if let Some(limit) = env_parse("SCREENER_LIMIT") {
            self.default_limit = Some(limit);
        }
        if let Ok(range) = std::env::var("SCREENER_HISTORY_RANGE") {
            self.history_range = Some(range);
        }
        if let Some(secs) = env_parse("SCREENER_REQUEST_TIMEOUT_SECS") {
            self.request_timeout = Some(Duration::from_secs(secs));
        }
        if let Some(rate) = env_parse("SCREENER_YAHOO_RPS") {
            self.yahoo_requests_per_second = Some(rate);
        }
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<ScreenerConfig> {
        let defaults = ScreenerConfig::default();

        let config = ScreenerConfig {
            index_name: self.index_name.unwrap_or(defaults.index_name),
            batch_size: self.batch_size.unwrap_or(defaults.batch_size),
            pool_width: self.pool_width.unwrap_or(defaults.pool_width),
            default_limit: self.default_limit.unwrap_or(defaults.default_limit),
            history_range: self.history_range.unwrap_or(defaults.history_range),
            history_attempts: self.history_attempts.unwrap_or(defaults.history_attempts),
            retry_delay: self.retry_delay.unwrap_or(defaults.retry_delay),
            request_timeout: self.request_timeout.unwrap_or(defaults.request_timeout),
            yahoo_requests_per_second: self
                .yahoo_requests_per_second
                .unwrap_or(defaults.yahoo_requests_per_second),
            criteria: self.criteria.unwrap_or(defaults.criteria),
            ..defaults
        };

        config.validate()?;
        Ok(config)
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "Ignoring unparseable environment override");
            None
        }
    }
}
