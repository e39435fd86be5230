//! Momentum indicators derived from the volatility history

use crate::error::{Result, StockError};
use ta::{Next, indicators::RelativeStrengthIndex};

/// Default RSI lookback
pub const RSI_PERIOD: usize = 14;

/// Relative strength index of the final close
///
/// Needs at least `period + 1` closes; returns `Ok(None)` otherwise.
pub fn rsi(closes: &[f64], period: usize) -> Result<Option<f64>> {
    if closes.len() <= period {
        return Ok(None);
    }

    let mut indicator =
        RelativeStrengthIndex::new(period).map_err(|e| StockError::IndicatorError(e.to_string()))?;

    let last = closes.iter().fold(0.0, |_, &close| indicator.next(close));
    Ok(last.is_finite().then_some(last))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rsi_needs_enough_closes() {
        let closes: Vec<f64> = (0..14).map(f64::from).collect();
        assert_eq!(rsi(&closes, RSI_PERIOD).unwrap(), None);
    }

    #[test]
    fn test_rsi_bounds() {
        let rising: Vec<f64> = (1..=30).map(f64::from).collect();
        let value = rsi(&rising, RSI_PERIOD).unwrap().unwrap();
        assert!(value > 70.0, "steady gains should read overbought, got {value}");

        let falling: Vec<f64> = (1..=30).rev().map(f64::from).collect();
        let value = rsi(&falling, RSI_PERIOD).unwrap().unwrap();
        assert!(value < 30.0, "steady losses should read oversold, got {value}");
    }

    #[test]
    fn test_rsi_zero_period_is_error() {
        let closes = [1.0, 2.0];
        assert!(matches!(
            rsi(&closes, 0),
            Err(StockError::IndicatorError(_))
        ));
    }
}
