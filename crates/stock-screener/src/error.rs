//! Error types for screening and bot operations

use thiserror::Error;

/// Screener specific errors
#[derive(Debug, Error)]
pub enum StockError {
    /// Invalid stock symbol provided
    #[error("Invalid symbol: {0}")]
    InvalidSymbol(String),

    /// Data not available for the requested symbol
    #[error("Data not available for {symbol}: {reason}")]
    DataUnavailable {
        symbol: String,
        reason: String,
    },

    /// Rate limit exceeded for API
    #[error("Rate limit exceeded for {provider}")]
    RateLimitExceeded {
        provider: String,
    },

    /// Network or HTTP error
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Request did not complete in time
    #[error("Timed out: {0}")]
    Timeout(String),

    /// Yahoo Finance API error
    #[error("Yahoo Finance error: {0}")]
    YahooFinanceError(String),

    /// NSE index API error
    #[error("NSE error: {0}")]
    NseError(String),

    /// Telegram Bot API error
    #[error("Telegram error: {0}")]
    TelegramError(String),

    /// Technical indicator calculation error
    #[error("Technical indicator error: {0}")]
    IndicatorError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Command parsing error
    #[error("Command error: {0}")]
    CommandError(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl StockError {
    /// Whether retrying the same request may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            StockError::NetworkError(e) => {
                e.is_timeout() || e.is_connect() || e.is_request() || e.is_body()
            }
            StockError::Timeout(_) | StockError::RateLimitExceeded { .. } => true,
            _ => false,
        }
    }
}

/// Result type alias for screener operations
pub type Result<T> = std::result::Result<T, StockError>;

/// Convert anyhow::Error to StockError
impl From<anyhow::Error> for StockError {
    fn from(err: anyhow::Error) -> Self {
        StockError::Other(err.to_string())
    }
}

impl From<tokio::time::error::Elapsed> for StockError {
    fn from(err: tokio::time::error::Elapsed) -> Self {
        StockError::Timeout(err.to_string())
    }
}
