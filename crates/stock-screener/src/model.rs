//! Data records flowing through a scan

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Divisor applied to the raw market cap for display
pub const MARKET_CAP_DISPLAY_DIVISOR: f64 = 100.0;

/// Exchange ticker, e.g. `RELIANCE.NS`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(String);

impl Symbol {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self(symbol.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Symbol {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Symbol {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl AsRef<str> for Symbol {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Point-in-time fundamentals for one lookup handle
///
/// The provider may omit any field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuoteSnapshot {
    pub short_name: Option<String>,
    pub current_price: Option<f64>,
    pub trailing_pe: Option<f64>,
    pub debt_to_equity: Option<f64>,
    /// Fraction, 0.08 means 8 %
    pub return_on_equity: Option<f64>,
    pub current_ratio: Option<f64>,
    pub market_cap: Option<f64>,
    pub average_volume: Option<u64>,
    /// Fraction, 0.012 means 1.2 %
    pub dividend_yield: Option<f64>,
    pub beta: Option<f64>,
    pub two_hundred_day_average: Option<f64>,
    pub sector: Option<String>,
}

impl QuoteSnapshot {
    /// Price and trailing P/E, when both are reported
    pub fn price_and_pe(&self) -> Option<(f64, f64)> {
        Some((self.current_price?, self.trailing_pe?))
    }
}

/// One daily close
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub timestamp: DateTime<Utc>,
    pub close: f64,
}

/// Daily closes over a lookback window, oldest first
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    pub symbol: String,
    pub points: Vec<PricePoint>,
}

impl PriceSeries {
    pub fn new(symbol: impl Into<String>, points: Vec<PricePoint>) -> Self {
        Self {
            symbol: symbol.into(),
            points,
        }
    }

    /// Build a series from bare closes, stamped one day apart ending now
    pub fn from_closes(symbol: impl Into<String>, closes: &[f64]) -> Self {
        let now = Utc::now();
        let len = closes.len() as i64;
        let points = closes
            .iter()
            .enumerate()
            .map(|(i, &close)| PricePoint {
                timestamp: now - chrono::Duration::days(len - 1 - i as i64),
                close,
            })
            .collect();
        Self::new(symbol, points)
    }

    pub fn closes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.close).collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// A stock that passed the filter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub symbol: Symbol,
    pub name: String,
    pub price: f64,
    pub pe: f64,
    /// Raw market cap as reported by the quote source
    pub market_cap: f64,
    /// Display string, see [`format_market_cap`]
    pub market_cap_display: String,
    /// Annualized volatility in percent, 0.0 when unknown
    pub volatility: f64,
    pub average_volume: u64,
    pub moving_average_200d: Option<f64>,
    pub rsi: Option<f64>,
    pub debt_to_equity: Option<f64>,
    /// Percent
    pub roe_pct: Option<f64>,
    /// Percent
    pub dividend_yield_pct: Option<f64>,
    pub beta: Option<f64>,
    pub sector: Option<String>,
}

impl Candidate {
    /// Placeholder returned when the symbol source yields nothing
    pub fn fallback() -> Self {
        let market_cap = 100_000.0;
        Self {
            symbol: Symbol::new("FALLBACK.NS"),
            name: "Example Stock".to_string(),
            price: 95.50,
            pe: 12.3,
            market_cap,
            market_cap_display: format_market_cap(market_cap),
            volatility: 25.5,
            average_volume: 0,
            moving_average_200d: None,
            rsi: None,
            debt_to_equity: None,
            roe_pct: None,
            dividend_yield_pct: None,
            beta: None,
            sector: None,
        }
    }

    /// Market cap in display units (raw / 100)
    pub fn market_cap_display_value(&self) -> f64 {
        self.market_cap / MARKET_CAP_DISPLAY_DIVISOR
    }
}

/// Render a raw market cap as `₹{raw / 100:.2}Cr`
pub fn format_market_cap(raw: f64) -> String {
    format!("₹{:.2}Cr", raw / MARKET_CAP_DISPLAY_DIVISOR)
}
