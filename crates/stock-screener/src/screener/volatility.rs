//! Annualized volatility from daily closes

use crate::api::QuoteProvider;
use crate::config::ScreenerConfig;
use crate::diagnostics::Diagnostics;
use crate::model::PriceSeries;
use crate::screener::technicals::{RSI_PERIOD, rsi};
use std::sync::Arc;
use std::time::Duration;

/// Trading days per year used to annualize daily returns
pub const TRADING_DAYS: f64 = 252.0;

/// Fewest closes that produce a volatility reading
pub const MIN_CLOSES: usize = 5;

/// Annualized volatility in percent, rounded to one decimal
///
/// Uses simple daily returns and the sample standard deviation. Fewer than
/// [`MIN_CLOSES`] closes yield `0.0`, which callers cannot tell apart from
/// a perfectly flat series.
pub fn annualized_volatility(closes: &[f64]) -> f64 {
    if closes.len() < MIN_CLOSES {
        return 0.0;
    }

    let returns: Vec<f64> = closes
        .windows(2)
        .map(|pair| (pair[1] - pair[0]) / pair[0])
        .collect();

    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);

    let annualized = variance.sqrt() * TRADING_DAYS.sqrt() * 100.0;
    if !annualized.is_finite() {
        return 0.0;
    }
    (annualized * 10.0).round() / 10.0
}

/// Indicators derived from a single history fetch
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct HistoryReading {
    /// Annualized volatility in percent, `0.0` when unavailable
    pub volatility: f64,

    /// 14-period RSI when enough closes came back
    pub rsi: Option<f64>,
}

/// Fetches price history with a fixed-delay retry and derives volatility
pub struct VolatilityEstimator {
    provider: Arc<dyn QuoteProvider>,
    diagnostics: Diagnostics,
    range: String,
    attempts: u32,
    retry_delay: Duration,
}

impl VolatilityEstimator {
    pub fn new(
        provider: Arc<dyn QuoteProvider>,
        config: &ScreenerConfig,
        diagnostics: Diagnostics,
    ) -> Self {
        Self {
            provider,
            diagnostics,
            range: config.history_range.clone(),
            attempts: config.history_attempts.max(1),
            retry_delay: config.retry_delay,
        }
    }

    /// Price history for a resolved handle, `None` once every attempt failed
    ///
    /// A short but successful response is returned as is, without retrying.
    pub async fn fetch_history(&self, handle: &str) -> Option<PriceSeries> {
        for attempt in 1..=self.attempts {
            match self.provider.history(handle, &self.range).await {
                Ok(series) => return Some(series),
                Err(e) if attempt < self.attempts => {
                    self.diagnostics.debug(&format!(
                        "History attempt {attempt}/{} for {handle} failed: {e}",
                        self.attempts
                    ));
                    tokio::time::sleep(self.retry_delay).await;
                }
                Err(e) => {
                    self.diagnostics.warn(&format!(
                        "Giving up on history for {handle} after {} attempts: {e}",
                        self.attempts
                    ));
                }
            }
        }
        None
    }

    /// Volatility and RSI for a resolved handle
    ///
    /// Missing history reads as zero volatility and no RSI.
    pub async fn estimate(&self, handle: &str) -> HistoryReading {
        let closes = self
            .fetch_history(handle)
            .await
            .map(|series| series.closes())
            .unwrap_or_default();

        let rsi = match rsi(&closes, RSI_PERIOD) {
            Ok(value) => value,
            Err(e) => {
                self.diagnostics
                    .debug(&format!("RSI unavailable for {handle}: {e}"));
                None
            }
        };

        HistoryReading {
            volatility: annualized_volatility(&closes),
            rsi,
        }
    }
}
