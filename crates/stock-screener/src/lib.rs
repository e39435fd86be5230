//! NSE value-stock screener
//!
//! This crate pulls the constituents of an NSE index, screens each listing
//! on price and fundamentals, ranks the survivors and posts them to a
//! Telegram chat with a commentary report per stock. It includes:
//!
//! - Index constituents from the NSE JSON API
//! - Quote fundamentals and daily history from Yahoo Finance
//! - A bounded-concurrency batch scanner with early stop
//! - Annualized volatility and RSI from daily closes
//! - Telegram HTML rendering and a long-polling bot
//!
//! # Example
//!
//! ```rust,ignore
//! use stock_screener::{BatchScanner, NseSymbolSource, ScreenerConfig, TracingDiagnostics,
//!     YahooFinanceClient};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ScreenerConfig::from_env()?;
//!     let diagnostics = TracingDiagnostics::shared();
//!
//!     let source = Arc::new(NseSymbolSource::new(&config, diagnostics.clone())?);
//!     let provider = Arc::new(YahooFinanceClient::new(&config)?);
//!     let scanner = BatchScanner::new(source, provider, config, diagnostics);
//!
//!     for candidate in scanner.scan(10).await {
//!         println!("{} {:.2}", candidate.symbol, candidate.pe);
//!     }
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod bot;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod model;
pub mod platforms;
pub mod report;
pub mod screener;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export main types for convenience
pub use api::{NseSymbolSource, QuoteProvider, SymbolSource, YahooFinanceClient};
pub use config::ScreenerConfig;
pub use diagnostics::{DiagnosticSink, Diagnostics, Severity, TracingDiagnostics};
pub use error::{Result, StockError};
pub use model::{Candidate, PriceSeries, QuoteSnapshot, Symbol};
pub use screener::{BatchScanner, FilterCriteria, StockFilter, VolatilityEstimator};
