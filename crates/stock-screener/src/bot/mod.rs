//! Chat bot front end for the screener
//!
//! The bot understands `/start`, `/help` and `/stocks [limit]`. A scan
//! posts a status message, edits it into the ranked summary, then sends one
//! analysis report per candidate.
//!
//! # Example
//!
//! ```rust,ignore
//! use stock_screener::bot::{BotConfig, StockBot};
//!
//! let bot = StockBot::new(transport, Arc::new(scanner), BotConfig::default());
//! bot.handle_message(chat_id, "/stocks 5").await;
//! ```

pub mod commands;

use crate::error::Result;
use crate::model::Candidate;
use crate::report::{generate_analysis, render_summary};
use crate::screener::BatchScanner;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

pub use commands::Command;

pub const STATUS_TEXT: &str = "🔍 Scanning for stocks under ₹100...";
pub const NO_STOCKS_TEXT: &str = "⚠️ No qualifying stocks found today.\n\n\
     Possible reasons:\n\
     - Market conditions too strict\n\
     - Temporary data issues\n\
     Try again later or adjust filters.";
pub const DETAIL_HEADER_TEXT: &str = "📊 <b>Detailed Analysis:</b>";
pub const NETWORK_ERROR_TEXT: &str = "🔴 Network Error\nPlease try again later";
pub const BUSY_TEXT: &str = "⚠️ System busy. Try /stocks again later.";

/// Outbound side of a chat platform
///
/// Message text is Telegram HTML.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Send a message, returning its id
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<i64>;

    /// Replace the text of a message sent earlier
    async fn edit_message(&self, chat_id: i64, message_id: i64, text: &str) -> Result<()>;

    /// Show the typing indicator for a few seconds
    async fn send_typing(&self, chat_id: i64) -> Result<()>;
}

/// Something that produces a ranked candidate list
#[async_trait]
pub trait Screener: Send + Sync {
    async fn scan(&self, limit: usize) -> Vec<Candidate>;
}

#[async_trait]
impl Screener for BatchScanner {
    async fn scan(&self, limit: usize) -> Vec<Candidate> {
        BatchScanner::scan(self, limit).await
    }
}

/// Configuration for the stock bot
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Limit used when `/stocks` has no argument
    pub default_limit: usize,
    /// Larger requested limits are clamped to this
    pub max_limit: usize,
    /// Pause after each analysis report
    pub report_pacing: Duration,
    /// Attempts of the whole `/stocks` flow on network failure
    pub send_attempts: u32,
    /// Pause before retry `n` is `retry_base_delay * n`
    pub retry_base_delay: Duration,
    /// Typing indicator refresh period
    pub typing_interval: Duration,
    /// Username used to filter `/command@username` mentions
    pub bot_username: Option<String>,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            default_limit: 10,
            max_limit: 25,
            report_pacing: Duration::from_secs(1),
            send_attempts: 3,
            retry_base_delay: Duration::from_secs(2),
            typing_interval: Duration::from_secs(4),
            bot_username: None,
        }
    }
}

impl BotConfig {
    /// Create a builder
    pub fn builder() -> BotConfigBuilder {
        BotConfigBuilder::default()
    }

    /// Resolve the scan limit for a `/stocks` request
    pub fn effective_limit(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.default_limit)
            .clamp(1, self.max_limit.max(1))
    }
}

/// Builder for BotConfig
#[derive(Debug, Default)]
pub struct BotConfigBuilder {
    default_limit: Option<usize>,
    max_limit: Option<usize>,
    report_pacing: Option<Duration>,
    send_attempts: Option<u32>,
    retry_base_delay: Option<Duration>,
    typing_interval: Option<Duration>,
    bot_username: Option<String>,
}

impl BotConfigBuilder {
    /// Set default limit
    pub fn default_limit(mut self, limit: usize) -> Self {
        self.default_limit = Some(limit);
        self
    }

    /// Set max limit
    pub fn max_limit(mut self, limit: usize) -> Self {
        self.max_limit = Some(limit);
        self
    }

    /// Set report pacing
    pub fn report_pacing(mut self, pacing: Duration) -> Self {
        self.report_pacing = Some(pacing);
        self
    }

    /// Set flow attempts
    pub fn send_attempts(mut self, attempts: u32) -> Self {
        self.send_attempts = Some(attempts);
        self
    }

    /// Set retry base delay
    pub fn retry_base_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay = Some(delay);
        self
    }

    /// Set typing interval
    pub fn typing_interval(mut self, interval: Duration) -> Self {
        self.typing_interval = Some(interval);
        self
    }

    /// Set bot username
    pub fn bot_username(mut self, username: impl Into<String>) -> Self {
        self.bot_username = Some(username.into());
        self
    }

    /// Build the config
    pub fn build(self) -> BotConfig {
        let defaults = BotConfig::default();
        BotConfig {
            default_limit: self.default_limit.unwrap_or(defaults.default_limit),
            max_limit: self.max_limit.unwrap_or(defaults.max_limit),
            report_pacing: self.report_pacing.unwrap_or(defaults.report_pacing),
            send_attempts: self.send_attempts.unwrap_or(defaults.send_attempts).max(1),
            retry_base_delay: self.retry_base_delay.unwrap_or(defaults.retry_base_delay),
            typing_interval: self.typing_interval.unwrap_or(defaults.typing_interval),
            bot_username: self.bot_username.or(defaults.bot_username),
        }
    }
}

/// The stock screener bot
pub struct StockBot {
    transport: Arc<dyn ChatTransport>,
    screener: Arc<dyn Screener>,
    config: BotConfig,
}

impl StockBot {
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        screener: Arc<dyn Screener>,
        config: BotConfig,
    ) -> Self {
        Self {
            transport,
            screener,
            config,
        }
    }

    /// Handle one incoming chat message
    pub async fn handle_message(&self, chat_id: i64, text: &str) {
        let command = match Command::parse(text, self.config.bot_username.as_deref()) {
            Ok(Some(command)) => command,
            Ok(None) => return,
            Err(e) => {
                tracing::debug!(chat_id, error = %e, "Rejected command");
                self.reply(chat_id, "Usage: /stocks [limit], e.g. /stocks 5")
                    .await;
                return;
            }
        };

        tracing::info!(chat_id, command = command.description(), "Handling command");

        match command {
            Command::Start | Command::Help => self.reply(chat_id, Command::help_text()).await,
            Command::Stocks { limit } => {
                self.handle_stocks(chat_id, self.config.effective_limit(limit))
                    .await;
            }
        }
    }

    async fn reply(&self, chat_id: i64, text: &str) {
        if let Err(e) = self.transport.send_message(chat_id, text).await {
            tracing::error!(chat_id, error = %e, "Failed to send reply");
        }
    }

    /// The `/stocks` flow
    pub async fn handle_stocks(&self, chat_id: i64, limit: usize) {
        let status_id = match self.transport.send_message(chat_id, STATUS_TEXT).await {
            Ok(id) => id,
            Err(e) => {
                tracing::error!(chat_id, error = %e, "Error in /stocks");
                self.reply(chat_id, BUSY_TEXT).await;
                return;
            }
        };

        let typing = self.spawn_typing(chat_id);
        let attempts = self.config.send_attempts;

        for attempt in 1..=attempts {
            match self.deliver(chat_id, status_id, limit).await {
                Ok(()) => break,
                Err(e) if e.is_transient() => {
                    tracing::warn!(chat_id, attempt, error = %e, "Network error in /stocks");
                    if attempt == attempts {
                        if let Err(e) = self
                            .transport
                            .edit_message(chat_id, status_id, NETWORK_ERROR_TEXT)
                            .await
                        {
                            tracing::error!(chat_id, error = %e, "Failed to report network error");
                        }
                    } else {
                        tokio::time::sleep(self.config.retry_base_delay * attempt).await;
                    }
                }
                Err(e) => {
                    tracing::error!(chat_id, error = %e, "Error in /stocks");
                    self.reply(chat_id, BUSY_TEXT).await;
                    break;
                }
            }
        }

        typing.abort();
    }

    async fn deliver(&self, chat_id: i64, status_id: i64, limit: usize) -> Result<()> {
        let candidates = self.screener.scan(limit).await;

        if candidates.is_empty() {
            return self
                .transport
                .edit_message(chat_id, status_id, NO_STOCKS_TEXT)
                .await;
        }

        self.transport
            .edit_message(chat_id, status_id, &render_summary(&candidates))
            .await?;
        self.transport
            .send_message(chat_id, DETAIL_HEADER_TEXT)
            .await?;

        for candidate in &candidates {
            let report = generate_analysis(candidate);
            match self.transport.send_message(chat_id, &report).await {
                Ok(_) => tokio::time::sleep(self.config.report_pacing).await,
                Err(e) => {
                    tracing::error!(symbol = %candidate.symbol, error = %e, "Analysis failed");
                }
            }
        }

        Ok(())
    }

    /// Keep the typing indicator alive until the returned task is aborted
    fn spawn_typing(&self, chat_id: i64) -> tokio::task::JoinHandle<()> {
        let transport = Arc::clone(&self.transport);
        let interval = self.config.typing_interval;
        tokio::spawn(async move {
            loop {
                if let Err(e) = transport.send_typing(chat_id).await {
                    tracing::error!(chat_id, error = %e, "Typing indicator error");
                    break;
                }
                tokio::time::sleep(interval).await;
            }
        })
    }
}

impl std::fmt::Debug for StockBot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StockBot")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FakeScreener, RecordingTransport, Sent};

    fn fast_config() -> BotConfig {
        BotConfig::builder()
            .report_pacing(Duration::from_secs(1))
            .retry_base_delay(Duration::from_secs(2))
            .build()
    }

    fn bot(transport: Arc<RecordingTransport>, screener: Arc<FakeScreener>) -> StockBot {
        StockBot::new(transport, screener, fast_config())
    }

    fn two_candidates() -> Vec<Candidate> {
        let mut second = Candidate::fallback();
        second.symbol = crate::model::Symbol::new("SECOND.NS");
        second.name = "Second Stock".to_string();
        vec![Candidate::fallback(), second]
    }

    #[test]
    fn test_effective_limit() {
        let config = BotConfig::default();
        assert_eq!(config.effective_limit(None), 10);
        assert_eq!(config.effective_limit(Some(3)), 3);
        assert_eq!(config.effective_limit(Some(500)), 25);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stocks_flow() {
        let transport = Arc::new(RecordingTransport::default());
        let screener = Arc::new(FakeScreener::new(two_candidates()));

        bot(transport.clone(), screener.clone())
            .handle_message(7, "/stocks 2")
            .await;

        assert_eq!(screener.limits(), vec![2]);

        let events = transport.messages();
        assert_eq!(events.len(), 5);
        assert_eq!(events[0], Sent::Message { id: 1, text: STATUS_TEXT.to_string() });
        match &events[1] {
            Sent::Edit { id, text } => {
                assert_eq!(*id, 1);
                assert!(text.contains("Top Stocks Under"));
                assert!(text.contains("SECOND.NS"));
            }
            other => panic!("Expected summary edit, got {other:?}"),
        }
        assert!(matches!(&events[2], Sent::Message { text, .. } if text == DETAIL_HEADER_TEXT));
        assert!(matches!(&events[3], Sent::Message { text, .. } if text.contains("FALLBACK.NS")));
        assert!(matches!(&events[4], Sent::Message { text, .. } if text.contains("SECOND.NS")));
        assert!(transport.typing_count() >= 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reports_are_paced() {
        let transport = Arc::new(RecordingTransport::default());
        let screener = Arc::new(FakeScreener::new(two_candidates()));

        let started = tokio::time::Instant::now();
        bot(transport, screener).handle_stocks(7, 10).await;

        assert_eq!(started.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_scan_edits_status() {
        let transport = Arc::new(RecordingTransport::default());
        let screener = Arc::new(FakeScreener::new(Vec::new()));

        bot(transport.clone(), screener)
            .handle_message(7, "/stocks")
            .await;

        assert_eq!(
            transport.messages(),
            vec![
                Sent::Message { id: 1, text: STATUS_TEXT.to_string() },
                Sent::Edit { id: 1, text: NO_STOCKS_TEXT.to_string() },
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_report_is_skipped() {
        let transport = Arc::new(RecordingTransport::default().failing_sends_containing("FALLBACK.NS"));
        let screener = Arc::new(FakeScreener::new(two_candidates()));

        bot(transport.clone(), screener).handle_stocks(7, 10).await;

        let reports: Vec<Sent> = transport
            .messages()
            .into_iter()
            .filter(|e| matches!(e, Sent::Message { text, .. } if text.contains("Comprehensive Analysis")))
            .collect();
        assert_eq!(reports.len(), 1);
        assert!(matches!(&reports[0], Sent::Message { text, .. } if text.contains("SECOND.NS")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failure_retries_flow() {
        let transport = Arc::new(RecordingTransport::default().transient_edit_failures(1));
        let screener = Arc::new(FakeScreener::new(two_candidates()));

        let started = tokio::time::Instant::now();
        bot(transport.clone(), screener.clone()).handle_stocks(7, 10).await;

        // 2 s before the retry, then 1 s per report
        assert_eq!(started.elapsed(), Duration::from_secs(4));
        assert_eq!(screener.limits(), vec![10, 10]);
        assert!(transport
            .messages()
            .iter()
            .any(|e| matches!(e, Sent::Edit { text, .. } if text.contains("Top Stocks Under"))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_retries_report_network_error() {
        let transport = Arc::new(RecordingTransport::default().transient_edit_failures(3));
        let screener = Arc::new(FakeScreener::new(two_candidates()));

        bot(transport.clone(), screener.clone()).handle_stocks(7, 10).await;

        assert_eq!(screener.limits().len(), 3);
        assert_eq!(
            transport.messages().last(),
            Some(&Sent::Edit { id: 1, text: NETWORK_ERROR_TEXT.to_string() })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_failure_replies_busy() {
        let transport = Arc::new(RecordingTransport::default().failing_edits());
        let screener = Arc::new(FakeScreener::new(two_candidates()));

        bot(transport.clone(), screener.clone()).handle_stocks(7, 10).await;

        assert_eq!(screener.limits().len(), 1);
        assert_eq!(
            transport.messages().last(),
            Some(&Sent::Message { id: 2, text: BUSY_TEXT.to_string() })
        );
    }

    #[tokio::test]
    async fn test_start_replies_with_help() {
        let mut transport = MockChatTransport::new();
        transport
            .expect_send_message()
            .withf(|chat_id, text| *chat_id == 7 && text.contains("/stocks"))
            .times(1)
            .returning(|_, _| Ok(1));

        let bot = StockBot::new(
            Arc::new(transport),
            Arc::new(FakeScreener::new(Vec::new())),
            BotConfig::default(),
        );
        bot.handle_message(7, "/start").await;
    }

    #[tokio::test]
    async fn test_plain_text_is_ignored() {
        let mut transport = MockChatTransport::new();
        transport.expect_send_message().never();

        let bot = StockBot::new(
            Arc::new(transport),
            Arc::new(FakeScreener::new(Vec::new())),
            BotConfig::default(),
        );
        bot.handle_message(7, "good morning").await;
    }
}
