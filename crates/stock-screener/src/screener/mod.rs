//! Screening pipeline: filter, volatility, ranking

pub mod filter;
pub mod scanner;
pub mod technicals;
pub mod volatility;

pub use filter::{FilterCriteria, ScreeningMetrics, StockFilter};
pub use scanner::{BatchScanner, rank};
pub use technicals::{RSI_PERIOD, rsi};
pub use volatility::{HistoryReading, VolatilityEstimator, annualized_volatility};
