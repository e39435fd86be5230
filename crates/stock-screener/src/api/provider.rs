//! Provider seams used by the screener

use crate::error::Result;
use crate::model::{PriceSeries, QuoteSnapshot, Symbol};
use async_trait::async_trait;

/// Source of the symbol universe for one scan
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SymbolSource: Send + Sync {
    /// Fetch every tradeable symbol of the target index
    ///
    /// Failures are reported through diagnostics and yield an empty list.
    async fn fetch_symbols(&self) -> Vec<Symbol>;
}

/// Quote and history lookups for a single ticker
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    /// Resolve one spelling of a ticker to its fundamentals
    async fn lookup(&self, symbol: &str) -> Result<QuoteSnapshot>;

    /// Daily closes for `symbol` over `range` (e.g. "1mo")
    async fn history(&self, symbol: &str, range: &str) -> Result<PriceSeries>;
}
