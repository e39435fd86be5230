//! Yahoo Finance API client
//!
//! Fundamentals come from the `quoteSummary` endpoint, which needs a
//! session cookie plus a crumb token. Daily history goes through
//! `yahoo_finance_api`.

use crate::api::provider::QuoteProvider;
use crate::config::ScreenerConfig;
use crate::error::{Result, StockError};
use crate::model::{PricePoint, PriceSeries, QuoteSnapshot};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::future::Future;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use yahoo_finance_api as yahoo;

const QUOTE_SUMMARY_URL: &str = "https://query1.finance.yahoo.com/v10/finance/quoteSummary";
const COOKIE_URL: &str = "https://fc.yahoo.com";
const CRUMB_URL: &str = "https://query1.finance.yahoo.com/v1/test/getcrumb";
const SUMMARY_MODULES: &str = "price,summaryDetail,financialData,assetProfile";
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36";

type SharedRateLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

/// Crumb shared by every request on one client
///
/// Concurrent misses queue on the write lock and only the first one runs
/// the refresh; the rest pick up its crumb.
#[derive(Debug, Default)]
struct CrumbCache {
    slot: RwLock<Option<String>>,
}

impl CrumbCache {
    async fn get_or_refresh<F, Fut>(&self, refresh: F) -> Result<String>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String>>,
    {
        if let Some(crumb) = self.slot.read().await.clone() {
            return Ok(crumb);
        }

        let mut slot = self.slot.write().await;
        if let Some(crumb) = slot.clone() {
            return Ok(crumb);
        }

        let crumb = refresh().await?;
        *slot = Some(crumb.clone());
        Ok(crumb)
    }

    /// Drop the cached crumb if it is still the one that was rejected
    async fn invalidate(&self, rejected: &str) {
        let mut slot = self.slot.write().await;
        if slot.as_deref() == Some(rejected) {
            *slot = None;
        }
    }
}

/// Yahoo Finance API client
#[derive(Debug, Clone)]
pub struct YahooFinanceClient {
    client: Client,
    crumb: Arc<CrumbCache>,
    rate_limiter: SharedRateLimiter,
    request_timeout: Duration,
}

impl YahooFinanceClient {
    /// Create a new Yahoo Finance client
    pub fn new(config: &ScreenerConfig) -> Result<Self> {
        let client = Client::builder()
            .cookie_store(true)
            .user_agent(USER_AGENT)
            .timeout(config.request_timeout)
            .build()?;

        let rate = NonZeroU32::new(config.yahoo_requests_per_second).ok_or_else(|| {
            StockError::ConfigError("yahoo_requests_per_second must be non-zero".to_string())
        })?;

        Ok(Self {
            client,
            crumb: Arc::new(CrumbCache::default()),
            rate_limiter: Arc::new(RateLimiter::direct(Quota::per_second(rate))),
            request_timeout: config.request_timeout,
        })
    }

    /// Cached crumb, fetched on first use
    async fn crumb(&self) -> Result<String> {
        self.crumb.get_or_refresh(|| self.fetch_crumb()).await
    }

    async fn fetch_crumb(&self) -> Result<String> {
        // Sets the session cookie; the status is a 404 more often than not
        self.rate_limiter.until_ready().await;
        let _ = self.client.get(COOKIE_URL).send().await;

        self.rate_limiter.until_ready().await;
        let response = self.client.get(CRUMB_URL).send().await?;
        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            return Err(StockError::RateLimitExceeded {
                provider: "Yahoo Finance".to_string(),
            });
        }
        if !response.status().is_success() {
            return Err(StockError::YahooFinanceError(format!(
                "crumb request returned {}",
                response.status()
            )));
        }

        let crumb = response.text().await?.trim().to_string();
        if crumb.is_empty() || crumb.len() > 64 || crumb.contains('<') {
            return Err(StockError::YahooFinanceError(
                "crumb response was not a token".to_string(),
            ));
        }

        tracing::debug!("Refreshed Yahoo crumb");
        Ok(crumb)
    }

    /// Fetch the fundamentals snapshot for one ticker spelling
    pub async fn get_quote_summary(&self, symbol: &str) -> Result<QuoteSnapshot> {
        let (status, body, crumb) = self.request_quote_summary(symbol).await?;

        // Stale crumb or cookie; refresh once
        let (status, body) = if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN
        {
            self.crumb.invalidate(&crumb).await;
            let (status, body, _) = self.request_quote_summary(symbol).await?;
            (status, body)
        } else {
            (status, body)
        };

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(StockError::RateLimitExceeded {
                provider: "Yahoo Finance".to_string(),
            });
        }

        // 404 bodies still carry a quoteSummary error we want to surface
        if !status.is_success() && status != StatusCode::NOT_FOUND {
            return Err(StockError::YahooFinanceError(format!(
                "quoteSummary for {symbol} returned {status}"
            )));
        }

        parse_quote_summary(symbol, &body)
    }

    async fn request_quote_summary(&self, symbol: &str) -> Result<(StatusCode, String, String)> {
        let crumb = self.crumb().await?;
        let url = format!("{QUOTE_SUMMARY_URL}/{symbol}");

        self.rate_limiter.until_ready().await;
        let response = self
            .client
            .get(&url)
            .query(&[("modules", SUMMARY_MODULES), ("crumb", crumb.as_str())])
            .header("Referer", "https://finance.yahoo.com/")
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        Ok((status, body, crumb))
    }

    /// Get historical quotes for a symbol
    pub async fn get_historical_quotes(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<PricePoint>> {
        let provider = yahoo::YahooConnector::new()
            .map_err(|e| StockError::YahooFinanceError(e.to_string()))?;

        // Convert chrono DateTime to time OffsetDateTime
        let start_odt = OffsetDateTime::from_unix_timestamp(start.timestamp()).map_err(|e| {
            StockError::YahooFinanceError(format!("Invalid start timestamp: {e}"))
        })?;
        let end_odt = OffsetDateTime::from_unix_timestamp(end.timestamp())
            .map_err(|e| StockError::YahooFinanceError(format!("Invalid end timestamp: {e}")))?;

        self.rate_limiter.until_ready().await;
        let response = tokio::time::timeout(
            self.request_timeout,
            provider.get_quote_history(symbol, start_odt, end_odt),
        )
        .await?
        .map_err(|e| StockError::YahooFinanceError(e.to_string()))?;

        let quotes = response
            .quotes()
            .map_err(|e| StockError::YahooFinanceError(e.to_string()))?;

        Ok(quotes
            .iter()
            .filter(|q| q.close.is_finite() && q.close > 0.0)
            .map(|q| PricePoint {
                timestamp: DateTime::from_timestamp(q.timestamp as i64, 0)
                    .unwrap_or_else(Utc::now),
                close: q.close,
            })
            .collect())
    }

    /// Get historical quotes with a specific range
    pub async fn get_historical_range(
        &self,
        symbol: &str,
        range: &str, // e.g., "1mo", "3mo", "1y"
    ) -> Result<Vec<PricePoint>> {
        let end = Utc::now();
        let start = match range {
            "5d" => end - chrono::Duration::days(5),
            "1mo" => end - chrono::Duration::days(30),
            "3mo" => end - chrono::Duration::days(90),
            "6mo" => end - chrono::Duration::days(180),
            "1y" => end - chrono::Duration::days(365),
            _ => return Err(StockError::InvalidSymbol(format!("Invalid range: {range}"))),
        };

        self.get_historical_quotes(symbol, start, end).await
    }
}

#[async_trait]
impl QuoteProvider for YahooFinanceClient {
    async fn lookup(&self, symbol: &str) -> Result<QuoteSnapshot> {
        tokio::time::timeout(self.request_timeout, self.get_quote_summary(symbol)).await?
    }

    async fn history(&self, symbol: &str, range: &str) -> Result<PriceSeries> {
        let points = self.get_historical_range(symbol, range).await?;
        Ok(PriceSeries::new(symbol, points))
    }
}

#[derive(Debug, Deserialize)]
struct QuoteSummaryResponse {
    #[serde(rename = "quoteSummary")]
    quote_summary: QuoteSummaryData,
}

#[derive(Debug, Deserialize)]
struct QuoteSummaryData {
    #[serde(default)]
    result: Option<Vec<QuoteSummaryResult>>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct QuoteSummaryResult {
    price: Option<PriceModule>,
    summary_detail: Option<SummaryDetailModule>,
    financial_data: Option<FinancialDataModule>,
    asset_profile: Option<AssetProfileModule>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct PriceModule {
    short_name: Option<String>,
    regular_market_price: RawValue,
    market_cap: RawValue,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct SummaryDetailModule {
    #[serde(rename = "trailingPE")]
    trailing_pe: RawValue,
    average_volume: RawValue,
    dividend_yield: RawValue,
    beta: RawValue,
    two_hundred_day_average: RawValue,
    market_cap: RawValue,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct FinancialDataModule {
    current_price: RawValue,
    debt_to_equity: RawValue,
    return_on_equity: RawValue,
    current_ratio: RawValue,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AssetProfileModule {
    sector: Option<String>,
}

/// Yahoo wraps numbers as `{"raw": 1.2, "fmt": "1.20"}`, or `{}` when absent
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawValue {
    raw: Option<f64>,
}

impl RawValue {
    fn value(&self) -> Option<f64> {
        self.raw.filter(|v| v.is_finite())
    }
}

/// Parse a `quoteSummary` body into a snapshot
pub(crate) fn parse_quote_summary(symbol: &str, body: &str) -> Result<QuoteSnapshot> {
    let response: QuoteSummaryResponse = serde_json::from_str(body)?;

    if let Some(error) = response.quote_summary.error.filter(|e| !e.is_null()) {
        let reason = error
            .get("description")
            .and_then(serde_json::Value::as_str)
            .map_or_else(|| error.to_string(), str::to_string);
        return Err(StockError::DataUnavailable {
            symbol: symbol.to_string(),
            reason,
        });
    }

    let result = response
        .quote_summary
        .result
        .and_then(|results| results.into_iter().next())
        .ok_or_else(|| StockError::DataUnavailable {
            symbol: symbol.to_string(),
            reason: "empty quoteSummary result".to_string(),
        })?;

    let price = result.price.unwrap_or_default();
    let detail = result.summary_detail.unwrap_or_default();
    let financial = result.financial_data.unwrap_or_default();

    Ok(QuoteSnapshot {
        short_name: price.short_name.filter(|n| !n.trim().is_empty()),
        current_price: financial
            .current_price
            .value()
            .or_else(|| price.regular_market_price.value()),
        trailing_pe: detail.trailing_pe.value(),
        debt_to_equity: financial.debt_to_equity.value(),
        return_on_equity: financial.return_on_equity.value(),
        current_ratio: financial.current_ratio.value(),
        market_cap: price.market_cap.value().or_else(|| detail.market_cap.value()),
        average_volume: detail
            .average_volume
            .value()
            .filter(|v| *v >= 0.0)
            .map(|v| v as u64),
        dividend_yield: detail.dividend_yield.value(),
        beta: detail.beta.value(),
        two_hundred_day_average: detail.two_hundred_day_average.value(),
        sector: result
            .asset_profile
            .and_then(|profile| profile.sector)
            .filter(|s| !s.trim().is_empty()),
    })
}
