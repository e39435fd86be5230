//! API clients for symbol and quote providers

pub mod nse;
pub mod provider;
pub mod yahoo;

pub use nse::NseSymbolSource;
pub use provider::{QuoteProvider, SymbolSource};
pub use yahoo::YahooFinanceClient;

#[cfg(test)]
pub use provider::{MockQuoteProvider, MockSymbolSource};
