//! Admission filter for a single symbol

use crate::api::QuoteProvider;
use crate::config::ScreenerConfig;
use crate::diagnostics::Diagnostics;
use crate::model::{Candidate, QuoteSnapshot, Symbol, format_market_cap};
use crate::screener::volatility::{HistoryReading, VolatilityEstimator};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Admission thresholds and the values substituted for missing fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterCriteria {
    /// Exclusive lower price bound
    pub min_price: f64,
    /// Exclusive upper price bound
    pub max_price: f64,
    pub max_pe: f64,
    pub max_debt_to_equity: f64,
    /// Fraction
    pub min_roe: f64,
    pub min_current_ratio: f64,
    pub min_market_cap: f64,
    /// Criteria that must hold for admission
    pub min_passing: usize,

    pub default_debt_to_equity: f64,
    pub default_roe: f64,
    /// Passes the current ratio check on its own
    pub default_current_ratio: f64,
    pub default_market_cap: f64,
}

impl Default for FilterCriteria {
    fn default() -> Self {
        Self {
            min_price: 10.0,
            max_price: 100.0,
            max_pe: 45.0,
            max_debt_to_equity: 2.0,
            min_roe: 0.05,
            min_current_ratio: 0.6,
            min_market_cap: 300.0,
            min_passing: 2,
            default_debt_to_equity: 2.0,
            default_roe: 0.0,
            default_current_ratio: 0.8,
            default_market_cap: 0.0,
        }
    }
}

impl FilterCriteria {
    /// Price strictly inside the configured band
    pub fn price_in_range(&self, price: f64) -> bool {
        price > self.min_price && price < self.max_price
    }
}

/// The five criterion inputs after default substitution
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreeningMetrics {
    pub pe: f64,
    pub debt_to_equity: f64,
    pub roe: f64,
    pub current_ratio: f64,
    pub market_cap: f64,
}

impl ScreeningMetrics {
    pub fn from_snapshot(snapshot: &QuoteSnapshot, criteria: &FilterCriteria) -> Self {
        Self {
            pe: snapshot.trailing_pe.unwrap_or(f64::INFINITY),
            debt_to_equity: snapshot
                .debt_to_equity
                .unwrap_or(criteria.default_debt_to_equity),
            roe: snapshot.return_on_equity.unwrap_or(criteria.default_roe),
            current_ratio: snapshot
                .current_ratio
                .unwrap_or(criteria.default_current_ratio),
            market_cap: snapshot.market_cap.unwrap_or(criteria.default_market_cap),
        }
    }

    /// Number of criteria that hold
    pub fn passing_count(&self, criteria: &FilterCriteria) -> usize {
        [
            self.pe < criteria.max_pe,
            self.debt_to_equity < criteria.max_debt_to_equity,
            self.roe > criteria.min_roe,
            self.current_ratio > criteria.min_current_ratio,
            self.market_cap > criteria.min_market_cap,
        ]
        .into_iter()
        .filter(|passed| *passed)
        .count()
    }

    pub fn admits(&self, criteria: &FilterCriteria) -> bool {
        self.passing_count(criteria) >= criteria.min_passing
    }
}

/// Lookup handle that reported both a price and a P/E
struct Resolved {
    handle: String,
    snapshot: QuoteSnapshot,
    price: f64,
    pe: f64,
}

/// Resolves a symbol against the quote provider and applies the criteria
pub struct StockFilter {
    provider: Arc<dyn QuoteProvider>,
    estimator: VolatilityEstimator,
    criteria: FilterCriteria,
    market_suffix: String,
    alternate_suffix: String,
    diagnostics: Diagnostics,
}

impl StockFilter {
    pub fn new(
        provider: Arc<dyn QuoteProvider>,
        config: &ScreenerConfig,
        diagnostics: Diagnostics,
    ) -> Self {
        Self {
            estimator: VolatilityEstimator::new(provider.clone(), config, diagnostics.clone()),
            provider,
            criteria: config.criteria.clone(),
            market_suffix: config.market_suffix.clone(),
            alternate_suffix: config.alternate_suffix.clone(),
            diagnostics,
        }
    }

    /// Lookup spellings tried in order, duplicates removed
    ///
    /// The symbol as given, without the market suffix, with the alternate
    /// exchange suffix, then lowercased.
    pub fn variants(&self, symbol: &str) -> Vec<String> {
        let stripped = symbol.strip_suffix(self.market_suffix.as_str());
        let candidates = [
            symbol.to_string(),
            stripped.unwrap_or(symbol).to_string(),
            stripped.map_or_else(
                || symbol.to_string(),
                |base| format!("{base}{}", self.alternate_suffix),
            ),
            symbol.to_lowercase(),
        ];

        let mut variants: Vec<String> = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            if !candidate.is_empty() && !variants.contains(&candidate) {
                variants.push(candidate);
            }
        }
        variants
    }

    async fn resolve(&self, symbol: &str) -> Option<Resolved> {
        for handle in self.variants(symbol) {
            match self.provider.lookup(&handle).await {
                Ok(snapshot) => {
                    if let Some((price, pe)) = snapshot.price_and_pe() {
                        return Some(Resolved {
                            handle,
                            snapshot,
                            price,
                            pe,
                        });
                    }
                    self.diagnostics
                        .debug(&format!("{handle} did not report both price and P/E"));
                }
                Err(e) => {
                    self.diagnostics
                        .debug(&format!("Lookup of {handle} failed: {e}"));
                }
            }
        }
        None
    }

    /// Evaluate one symbol, returning a candidate when it is admitted
    pub async fn evaluate(&self, symbol: &Symbol) -> Option<Candidate> {
        let Some(resolved) = self.resolve(symbol.as_str()).await else {
            self.diagnostics
                .debug(&format!("No usable quote for {symbol}"));
            return None;
        };

        if !self.criteria.price_in_range(resolved.price) {
            self.diagnostics.debug(&format!(
                "{symbol} rejected on price {:.2}",
                resolved.price
            ));
            return None;
        }

        let metrics = ScreeningMetrics::from_snapshot(&resolved.snapshot, &self.criteria);
        let passing = metrics.passing_count(&self.criteria);
        if passing < self.criteria.min_passing {
            self.diagnostics.debug(&format!(
                "{symbol} rejected with {passing}/5 criteria"
            ));
            return None;
        }

        let reading = self.estimator.estimate(&resolved.handle).await;
        Some(build_candidate(symbol, resolved, reading, &metrics))
    }
}

fn build_candidate(
    symbol: &Symbol,
    resolved: Resolved,
    reading: HistoryReading,
    metrics: &ScreeningMetrics,
) -> Candidate {
    let Resolved {
        snapshot,
        price,
        pe,
        ..
    } = resolved;

    Candidate {
        symbol: symbol.clone(),
        name: snapshot
            .short_name
            .unwrap_or_else(|| symbol.as_str().to_string()),
        price,
        pe,
        market_cap: metrics.market_cap,
        market_cap_display: format_market_cap(metrics.market_cap),
        volatility: reading.volatility,
        average_volume: snapshot.average_volume.unwrap_or(0),
        moving_average_200d: snapshot.two_hundred_day_average,
        rsi: reading.rsi,
        debt_to_equity: snapshot.debt_to_equity,
        roe_pct: snapshot.return_on_equity.map(|roe| roe * 100.0),
        dividend_yield_pct: snapshot.dividend_yield.map(|y| y * 100.0),
        beta: snapshot.beta,
        sector: snapshot.sector,
    }
}
