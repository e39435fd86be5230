//! Batch scanning over the symbol universe

use crate::api::{QuoteProvider, SymbolSource};
use crate::config::ScreenerConfig;
use crate::diagnostics::Diagnostics;
use crate::error::{Result, StockError};
use crate::model::{Candidate, Symbol};
use crate::screener::filter::StockFilter;
use std::cmp::Ordering;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::Instrument;
use uuid::Uuid;

/// Fans the stock filter out over the universe on a bounded pool
pub struct BatchScanner {
    source: Arc<dyn SymbolSource>,
    filter: Arc<StockFilter>,
    pool: Arc<Semaphore>,
    config: ScreenerConfig,
    diagnostics: Diagnostics,
}

impl BatchScanner {
    pub fn new(
        source: Arc<dyn SymbolSource>,
        provider: Arc<dyn QuoteProvider>,
        config: ScreenerConfig,
        diagnostics: Diagnostics,
    ) -> Self {
        let filter = StockFilter::new(provider, &config, diagnostics.clone());
        Self {
            source,
            filter: Arc::new(filter),
            pool: Arc::new(Semaphore::new(config.pool_width.max(1))),
            config,
            diagnostics,
        }
    }

    /// Scan the universe and return at most `limit` ranked candidates
    ///
    /// An empty universe yields the single fallback candidate. Any worker
    /// failure yields an empty list.
    pub async fn scan(&self, limit: usize) -> Vec<Candidate> {
        if limit == 0 {
            return Vec::new();
        }

        let span = tracing::info_span!("scan", scan_id = %Uuid::new_v4(), limit);
        async {
            let symbols = self.source.fetch_symbols().await;
            if symbols.is_empty() {
                self.diagnostics
                    .error("Symbol source returned nothing, using fallback candidate");
                return vec![Candidate::fallback()];
            }

            let target = self.config.collection_target(limit);
            match self.collect(symbols, target).await {
                Ok(mut candidates) => {
                    rank(&mut candidates, limit);
                    self.diagnostics
                        .info(&format!("Scan finished with {} candidates", candidates.len()));
                    candidates
                }
                Err(e) => {
                    self.diagnostics.critical(&format!("Scan aborted: {e}"));
                    Vec::new()
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Evaluate batches until `target` candidates are collected
    async fn collect(&self, symbols: Vec<Symbol>, target: usize) -> Result<Vec<Candidate>> {
        let batch_size = self.config.batch_size.max(1);
        let total = symbols.len();
        let mut collected = Vec::new();

        for (index, batch) in symbols.chunks(batch_size).enumerate() {
            if collected.len() >= target {
                break;
            }

            let mut workers = JoinSet::new();
            for symbol in batch {
                let symbol = symbol.clone();
                let filter = Arc::clone(&self.filter);
                let pool = Arc::clone(&self.pool);
                workers.spawn(async move {
                    let _permit = pool
                        .acquire_owned()
                        .await
                        .map_err(|e| StockError::Other(format!("worker pool closed: {e}")))?;
                    Ok::<_, StockError>(filter.evaluate(&symbol).await)
                });
            }

            while let Some(joined) = workers.join_next().await {
                let outcome =
                    joined.map_err(|e| StockError::Other(format!("worker failed: {e}")))?;
                if let Some(candidate) = outcome? {
                    collected.push(candidate);
                }
            }

            self.diagnostics.info(&format!(
                "Batch {} done ({}/{total} symbols), {} candidates so far",
                index + 1,
                (index * batch_size + batch.len()).min(total),
                collected.len()
            ));
        }

        Ok(collected)
    }
}

/// Sort by P/E ascending, then price descending, and keep `limit`
pub fn rank(candidates: &mut Vec<Candidate>, limit: usize) {
    candidates.sort_by(compare_candidates);
    candidates.truncate(limit);
}

fn compare_candidates(a: &Candidate, b: &Candidate) -> Ordering {
    pe_key(a.pe)
        .total_cmp(&pe_key(b.pe))
        .then_with(|| b.price.total_cmp(&a.price))
}

// NaN sorts after every real P/E
fn pe_key(pe: f64) -> f64 {
    if pe.is_nan() { f64::INFINITY } else { pe }
}
