//! Hand-written fakes shared by unit tests

use crate::api::{QuoteProvider, SymbolSource};
use crate::bot::{ChatTransport, Screener};
use crate::diagnostics::{DiagnosticSink, Severity};
use crate::error::{Result, StockError};
use crate::model::{Candidate, PriceSeries, QuoteSnapshot, Symbol};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};

/// Snapshot with only price and P/E set
pub fn quote(price: f64, pe: f64) -> QuoteSnapshot {
    QuoteSnapshot {
        current_price: Some(price),
        trailing_pe: Some(pe),
        ..Default::default()
    }
}

/// Sink that keeps everything it receives
#[derive(Debug, Default)]
pub struct RecordingDiagnostics {
    entries: Mutex<Vec<(Severity, String)>>,
}

impl RecordingDiagnostics {
    pub fn entries(&self) -> Vec<(Severity, String)> {
        self.entries.lock().unwrap().clone()
    }

    /// Messages recorded at exactly `severity`
    pub fn at(&self, severity: Severity) -> Vec<String> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .filter(|(s, _)| *s == severity)
            .map(|(_, message)| message.clone())
            .collect()
    }
}

impl DiagnosticSink for RecordingDiagnostics {
    fn emit(&self, severity: Severity, message: &str) {
        self.entries
            .lock()
            .unwrap()
            .push((severity, message.to_string()));
    }
}

/// Fixed universe
pub struct FakeSymbolSource {
    symbols: Vec<Symbol>,
}

impl FakeSymbolSource {
    pub fn new(symbols: &[&str]) -> Self {
        Self {
            symbols: symbols.iter().copied().map(Symbol::from).collect(),
        }
    }
}

#[async_trait]
impl SymbolSource for FakeSymbolSource {
    async fn fetch_symbols(&self) -> Vec<Symbol> {
        self.symbols.clone()
    }
}

/// Map-backed quote provider
///
/// Unknown handles fail with `DataUnavailable`. History is empty for every
/// handle unless set.
#[derive(Default)]
pub struct FakeQuoteProvider {
    quotes: HashMap<String, QuoteSnapshot>,
    histories: HashMap<String, Vec<f64>>,
    panic_on: Option<String>,
    lookups: Mutex<HashSet<String>>,
    lookup_delay: Option<Duration>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl FakeQuoteProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quote(mut self, handle: &str, snapshot: QuoteSnapshot) -> Self {
        self.quotes.insert(handle.to_string(), snapshot);
        self
    }

    pub fn with_history(mut self, handle: &str, closes: &[f64]) -> Self {
        self.histories.insert(handle.to_string(), closes.to_vec());
        self
    }

    /// Panic inside `lookup` for this handle
    pub fn panicking_on(mut self, handle: &str) -> Self {
        self.panic_on = Some(handle.to_string());
        self
    }

    /// Hold every lookup open for `delay`
    pub fn with_lookup_delay(mut self, delay: Duration) -> Self {
        self.lookup_delay = Some(delay);
        self
    }

    pub fn looked_up(&self, handle: &str) -> bool {
        self.lookups.lock().unwrap().contains(handle)
    }

    /// Most lookups that were ever running at once
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QuoteProvider for FakeQuoteProvider {
    async fn lookup(&self, symbol: &str) -> Result<QuoteSnapshot> {
        self.lookups.lock().unwrap().insert(symbol.to_string());

        if let Some(delay) = self.lookup_delay {
            let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak_in_flight.fetch_max(running, Ordering::SeqCst);
            tokio::time::sleep(delay).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
        }

        assert!(
            self.panic_on.as_deref() != Some(symbol),
            "lookup of {symbol} blew up"
        );
        self.quotes
            .get(symbol)
            .cloned()
            .ok_or_else(|| StockError::DataUnavailable {
                symbol: symbol.to_string(),
                reason: "unknown to fake".to_string(),
            })
    }

    async fn history(&self, symbol: &str, _range: &str) -> Result<PriceSeries> {
        let closes = self.histories.get(symbol).cloned().unwrap_or_default();
        Ok(PriceSeries::from_closes(symbol, &closes))
    }
}

/// Screener returning a fixed list and recording requested limits
pub struct FakeScreener {
    results: Vec<Candidate>,
    limits: Mutex<Vec<usize>>,
}

impl FakeScreener {
    pub fn new(results: Vec<Candidate>) -> Self {
        Self {
            results,
            limits: Mutex::new(Vec::new()),
        }
    }

    pub fn limits(&self) -> Vec<usize> {
        self.limits.lock().unwrap().clone()
    }
}

#[async_trait]
impl Screener for FakeScreener {
    async fn scan(&self, limit: usize) -> Vec<Candidate> {
        self.limits.lock().unwrap().push(limit);
        self.results.iter().take(limit).cloned().collect()
    }
}

/// Outbound message recorded by [`RecordingTransport`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Message { id: i64, text: String },
    Edit { id: i64, text: String },
}

/// Transport that records messages and can be told to fail
#[derive(Debug, Default)]
pub struct RecordingTransport {
    events: Mutex<Vec<Sent>>,
    next_id: AtomicI64,
    typing: AtomicUsize,
    failing_marker: Option<String>,
    transient_edit_failures: AtomicUsize,
    fail_edits: bool,
}

impl RecordingTransport {
    /// Sends whose text contains `marker` fail with a Telegram error
    pub fn failing_sends_containing(mut self, marker: &str) -> Self {
        self.failing_marker = Some(marker.to_string());
        self
    }

    /// The first `count` edits time out
    pub fn transient_edit_failures(self, count: usize) -> Self {
        self.transient_edit_failures.store(count, Ordering::SeqCst);
        self
    }

    /// Every edit fails with a non-transient error
    pub fn failing_edits(mut self) -> Self {
        self.fail_edits = true;
        self
    }

    pub fn messages(&self) -> Vec<Sent> {
        self.events.lock().unwrap().clone()
    }

    pub fn typing_count(&self) -> usize {
        self.typing.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatTransport for RecordingTransport {
    async fn send_message(&self, _chat_id: i64, text: &str) -> Result<i64> {
        if let Some(marker) = &self.failing_marker {
            if text.contains(marker.as_str()) {
                return Err(StockError::TelegramError("Bad Request".to_string()));
            }
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.events.lock().unwrap().push(Sent::Message {
            id,
            text: text.to_string(),
        });
        Ok(id)
    }

    async fn edit_message(&self, _chat_id: i64, message_id: i64, text: &str) -> Result<()> {
        if self.fail_edits {
            return Err(StockError::TelegramError("Bad Request".to_string()));
        }
        let remaining = self.transient_edit_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.transient_edit_failures
                .store(remaining - 1, Ordering::SeqCst);
            return Err(StockError::Timeout("editMessageText".to_string()));
        }
        self.events.lock().unwrap().push(Sent::Edit {
            id: message_id,
            text: text.to_string(),
        });
        Ok(())
    }

    async fn send_typing(&self, _chat_id: i64) -> Result<()> {
        self.typing.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
