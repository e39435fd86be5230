//! NSE index constituents
//!
//! The NSE JSON API refuses requests without the session cookies its web
//! pages set, so every fetch first visits two pages with browser headers.

use crate::api::provider::SymbolSource;
use crate::config::ScreenerConfig;
use crate::diagnostics::Diagnostics;
use crate::error::{Result, StockError};
use crate::model::Symbol;
use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{self, HeaderMap, HeaderValue};
use serde::Deserialize;
use std::time::Duration;

const NSE_HOME: &str = "https://www.nseindia.com";
const NSE_MARKET_PAGE: &str = "https://www.nseindia.com/market-data/live-equity-market";
const NSE_INDEX_API: &str = "https://www.nseindia.com/api/equity-stockIndices";
const BROWSER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Symbol source backed by the NSE `equity-stockIndices` endpoint
pub struct NseSymbolSource {
    client: Client,
    index_name: String,
    market_suffix: String,
    warmup_delay: Duration,
    diagnostics: Diagnostics,
}

impl NseSymbolSource {
    pub fn new(config: &ScreenerConfig, diagnostics: Diagnostics) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::ACCEPT_LANGUAGE,
            HeaderValue::from_static("en-US,en;q=0.9"),
        );

        let client = Client::builder()
            .cookie_store(true)
            .user_agent(BROWSER_AGENT)
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            client,
            index_name: config.index_name.clone(),
            market_suffix: config.market_suffix.clone(),
            warmup_delay: Duration::from_secs(1),
            diagnostics,
        })
    }

    async fn warm_up(&self) -> Result<()> {
        for page in [NSE_HOME, NSE_MARKET_PAGE] {
            self.client
                .get(page)
                .header(
                    header::ACCEPT,
                    "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
                )
                .send()
                .await?;
            tokio::time::sleep(self.warmup_delay).await;
        }
        Ok(())
    }

    async fn try_fetch(&self) -> Result<Vec<Symbol>> {
        self.warm_up().await?;

        let response = self
            .client
            .get(NSE_INDEX_API)
            .query(&[("index", self.index_name.as_str())])
            .header(header::ACCEPT, "application/json, text/plain, */*")
            .header(header::REFERER, NSE_MARKET_PAGE)
            .header("X-Requested-With", "XMLHttpRequest")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(StockError::NseError(format!(
                "index request returned {}",
                response.status()
            )));
        }

        let body = response.text().await?;
        parse_index_constituents(&body, &self.index_name, &self.market_suffix)
    }
}

#[async_trait]
impl SymbolSource for NseSymbolSource {
    async fn fetch_symbols(&self) -> Vec<Symbol> {
        match self.try_fetch().await {
            Ok(symbols) => {
                self.diagnostics.info(&format!(
                    "Fetched {} symbols for {}",
                    symbols.len(),
                    self.index_name
                ));
                symbols
            }
            Err(e) => {
                self.diagnostics
                    .error(&format!("Failed to fetch {} constituents: {e}", self.index_name));
                Vec::new()
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct IndexResponse {
    #[serde(default)]
    data: Vec<IndexEntry>,
}

#[derive(Debug, Deserialize)]
struct IndexEntry {
    #[serde(default)]
    symbol: Option<serde_json::Value>,
}

/// Extract constituent tickers from an index response
///
/// The row carrying the index itself is skipped, as are entries whose
/// symbol is missing or not a string.
pub(crate) fn parse_index_constituents(
    body: &str,
    index_name: &str,
    market_suffix: &str,
) -> Result<Vec<Symbol>> {
    let response: IndexResponse = serde_json::from_str(body)?;

    Ok(response
        .data
        .into_iter()
        .filter_map(|entry| entry.symbol?.as_str().map(str::trim).map(str::to_string))
        .filter(|symbol| !symbol.is_empty() && !symbol.eq_ignore_ascii_case(index_name))
        .map(|symbol| Symbol::new(format!("{symbol}{market_suffix}")))
        .collect())
}
