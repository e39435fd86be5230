//! Telegram Bot API over HTTPS long polling

use crate::bot::{BotConfig, ChatTransport, Screener, StockBot};
use crate::error::{Result, StockError};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;

const API_BASE: &str = "https://api.telegram.org";

/// Telegram bot configuration
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    /// Bot token from BotFather
    pub token: String,

    /// Long poll timeout passed to `getUpdates`
    pub poll_timeout: Duration,

    /// Pause after a failed poll
    pub error_backoff: Duration,

    /// Bot API server, overridable for a self-hosted one
    pub api_base: String,
}

impl TelegramConfig {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            poll_timeout: Duration::from_secs(30),
            error_backoff: Duration::from_secs(5),
            api_base: API_BASE.to_string(),
        }
    }

    /// Create config from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create config from any key lookup
    ///
    /// Reads `TELEGRAM_BOT_TOKEN` and the optional
    /// `TELEGRAM_POLL_TIMEOUT_SECS` and `TELEGRAM_API_BASE`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let token = lookup("TELEGRAM_BOT_TOKEN")
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| StockError::ConfigError("TELEGRAM_BOT_TOKEN not set".to_string()))?;

        let mut config = Self::new(token.trim());

        if let Some(raw) = lookup("TELEGRAM_POLL_TIMEOUT_SECS") {
            let secs: u64 = raw.trim().parse().map_err(|_| {
                StockError::ConfigError(format!("Invalid TELEGRAM_POLL_TIMEOUT_SECS: {raw}"))
            })?;
            config.poll_timeout = Duration::from_secs(secs);
        }

        if let Some(base) = lookup("TELEGRAM_API_BASE").filter(|b| !b.trim().is_empty()) {
            config.api_base = base.trim().trim_end_matches('/').to_string();
        }

        Ok(config)
    }
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    parameters: Option<ResponseParameters>,
}

#[derive(Debug, Deserialize)]
struct ResponseParameters {
    #[serde(default)]
    retry_after: Option<u64>,
}

/// Subset of a Telegram `User`
#[derive(Debug, Clone, Deserialize)]
pub struct BotUser {
    pub id: i64,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SentMessage {
    message_id: i64,
}

/// Text message pulled from an update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingMessage {
    pub update_id: i64,
    pub chat_id: i64,
    pub text: String,
}

/// Thin Telegram Bot API client
#[derive(Debug, Clone)]
pub struct TelegramClient {
    client: Client,
    api_base: String,
    token: String,
    poll_timeout: Duration,
}

impl TelegramClient {
    pub fn new(config: &TelegramConfig) -> Result<Self> {
        // Long polls hold the connection open for the whole poll timeout
        let client = Client::builder()
            .timeout(config.poll_timeout + Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            api_base: config.api_base.clone(),
            token: config.token.clone(),
            poll_timeout: config.poll_timeout,
        })
    }

    fn api_url(&self, method: &str) -> String {
        format!("{}/bot{}/{method}", self.api_base, self.token)
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, body: Value) -> Result<T> {
        // The token sits in the URL path; keep it out of error text
        let response = self
            .client
            .post(self.api_url(method))
            .json(&body)
            .send()
            .await
            .map_err(reqwest::Error::without_url)?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(reqwest::Error::without_url)?;
        decode_response(method, status, &text)
    }

    /// Identity of the bot behind the token
    pub async fn get_me(&self) -> Result<BotUser> {
        self.call("getMe", json!({})).await
    }

    /// Long poll for raw updates after `offset`
    pub async fn get_updates(&self, offset: i64) -> Result<Vec<Value>> {
        self.call(
            "getUpdates",
            json!({
                "offset": offset,
                "timeout": self.poll_timeout.as_secs(),
                "allowed_updates": ["message"],
            }),
        )
        .await
    }
}

#[async_trait]
impl ChatTransport for TelegramClient {
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<i64> {
        let sent: SentMessage = self
            .call(
                "sendMessage",
                json!({
                    "chat_id": chat_id,
                    "text": text,
                    "parse_mode": "HTML",
                    "disable_web_page_preview": true,
                }),
            )
            .await?;
        Ok(sent.message_id)
    }

    async fn edit_message(&self, chat_id: i64, message_id: i64, text: &str) -> Result<()> {
        let result: Result<Value> = self
            .call(
                "editMessageText",
                json!({
                    "chat_id": chat_id,
                    "message_id": message_id,
                    "text": text,
                    "parse_mode": "HTML",
                    "disable_web_page_preview": true,
                }),
            )
            .await;

        match result {
            Ok(_) => Ok(()),
            // Editing to identical text is rejected but harmless
            Err(StockError::TelegramError(msg)) if msg.contains("message is not modified") => {
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn send_typing(&self, chat_id: i64) -> Result<()> {
        let _: bool = self
            .call(
                "sendChatAction",
                json!({ "chat_id": chat_id, "action": "typing" }),
            )
            .await?;
        Ok(())
    }
}

fn decode_response<T: DeserializeOwned>(method: &str, status: StatusCode, body: &str) -> Result<T> {
    let parsed: ApiResponse<T> = serde_json::from_str(body).map_err(|e| {
        StockError::TelegramError(format!("{method} returned {status} with unreadable body: {e}"))
    })?;

    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = parsed
            .parameters
            .and_then(|p| p.retry_after)
            .unwrap_or_default();
        tracing::warn!(method, retry_after, "Telegram flood control");
        return Err(StockError::RateLimitExceeded {
            provider: "Telegram".to_string(),
        });
    }

    if !parsed.ok {
        return Err(StockError::TelegramError(format!(
            "{method}: {}",
            parsed
                .description
                .unwrap_or_else(|| status.to_string())
        )));
    }

    parsed
        .result
        .ok_or_else(|| StockError::TelegramError(format!("{method}: missing result")))
}

/// Pull text messages out of raw updates
pub fn extract_messages(updates: &[Value]) -> Vec<IncomingMessage> {
    updates
        .iter()
        .filter_map(|update| {
            let update_id = update.get("update_id")?.as_i64()?;
            let message = update.get("message")?;
            let chat_id = message.get("chat")?.get("id")?.as_i64()?;
            let text = message.get("text")?.as_str()?.to_string();
            Some(IncomingMessage {
                update_id,
                chat_id,
                text,
            })
        })
        .collect()
}

/// Highest update id seen plus one
fn next_offset(updates: &[Value], current: i64) -> i64 {
    updates
        .iter()
        .filter_map(|u| u.get("update_id").and_then(Value::as_i64))
        .map(|id| id + 1)
        .fold(current, i64::max)
}

/// Telegram bot
pub struct TelegramBot {
    client: Arc<TelegramClient>,
    bot: Arc<StockBot>,
    config: TelegramConfig,
}

impl TelegramBot {
    /// Verify the token with `getMe` and wire the bot
    pub async fn connect(
        config: TelegramConfig,
        screener: Arc<dyn Screener>,
        mut bot_config: BotConfig,
    ) -> Result<Self> {
        let client = Arc::new(TelegramClient::new(&config)?);

        let me = client.get_me().await?;
        tracing::info!(bot_id = me.id, username = ?me.username, "Connected to Telegram");
        if bot_config.bot_username.is_none() {
            bot_config.bot_username = me.username;
        }

        let transport: Arc<dyn ChatTransport> = client.clone();
        let bot = Arc::new(StockBot::new(transport, screener, bot_config));

        Ok(Self {
            client,
            bot,
            config,
        })
    }

    /// Poll forever, handling each message on its own task
    pub async fn run(&self) -> Result<()> {
        let mut offset = 0;
        tracing::info!("Bot starting...");

        loop {
            let updates = match self.client.get_updates(offset).await {
                Ok(updates) => updates,
                Err(e) => {
                    tracing::error!(error = %e, "Polling failed");
                    tokio::time::sleep(self.config.error_backoff).await;
                    continue;
                }
            };

            offset = next_offset(&updates, offset);

            for message in extract_messages(&updates) {
                let bot = Arc::clone(&self.bot);
                tokio::spawn(async move {
                    bot.handle_message(message.chat_id, &message.text).await;
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_telegram_config_from_lookup() {
        let config = TelegramConfig::from_lookup(|key| match key {
            "TELEGRAM_BOT_TOKEN" => Some("123:ABC".to_string()),
            "TELEGRAM_POLL_TIMEOUT_SECS" => Some("15".to_string()),
            _ => None,
        })
        .unwrap();

        assert_eq!(config.token, "123:ABC");
        assert_eq!(config.poll_timeout, Duration::from_secs(15));
        assert_eq!(config.error_backoff, Duration::from_secs(5));
    }

    #[test]
    fn test_telegram_config_requires_token() {
        let result = TelegramConfig::from_lookup(|_| None);
        assert!(matches!(result, Err(StockError::ConfigError(_))));

        let result = TelegramConfig::from_lookup(|key| {
            (key == "TELEGRAM_BOT_TOKEN").then(|| "  ".to_string())
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_api_url() {
        let client = TelegramClient::new(&TelegramConfig::new("123:ABC")).unwrap();
        assert_eq!(
            client.api_url("getMe"),
            "https://api.telegram.org/bot123:ABC/getMe"
        );
    }

    #[tokio::test]
    async fn test_network_errors_hide_token() {
        // Nothing listens on the discard port
        let config = TelegramConfig::from_lookup(|key| match key {
            "TELEGRAM_BOT_TOKEN" => Some("123:SUPERSECRET".to_string()),
            "TELEGRAM_API_BASE" => Some("http://127.0.0.1:9/".to_string()),
            _ => None,
        })
        .unwrap();
        let client = TelegramClient::new(&config).unwrap();
        assert_eq!(client.api_url("getMe"), "http://127.0.0.1:9/bot123:SUPERSECRET/getMe");

        let err = client.get_me().await.unwrap_err();
        assert!(matches!(err, StockError::NetworkError(_)));
        assert!(!err.to_string().contains("SUPERSECRET"));
        assert!(!format!("{err:?}").contains("SUPERSECRET"));
    }

    #[test]
    fn test_extract_messages() {
        let updates: Vec<Value> = serde_json::from_str(
            r#"[
                {"update_id": 10, "message": {"message_id": 1, "chat": {"id": 42}, "text": "/stocks"}},
                {"update_id": 11, "message": {"message_id": 2, "chat": {"id": 42}, "sticker": {}}},
                {"update_id": 12, "edited_message": {"chat": {"id": 42}, "text": "/help"}}
            ]"#,
        )
        .unwrap();

        assert_eq!(
            extract_messages(&updates),
            vec![IncomingMessage {
                update_id: 10,
                chat_id: 42,
                text: "/stocks".to_string(),
            }]
        );
        assert_eq!(next_offset(&updates, 0), 13);
        assert_eq!(next_offset(&[], 13), 13);
    }

    #[test]
    fn test_decode_response() {
        let sent: SentMessage = decode_response(
            "sendMessage",
            StatusCode::OK,
            r#"{"ok": true, "result": {"message_id": 99}}"#,
        )
        .unwrap();
        assert_eq!(sent.message_id, 99);

        let err = decode_response::<SentMessage>("sendMessage", StatusCode::OK, r#"{"ok": true}"#)
            .unwrap_err();
        assert!(matches!(err, StockError::TelegramError(msg) if msg.contains("missing result")));

        let err = decode_response::<Value>(
            "editMessageText",
            StatusCode::BAD_REQUEST,
            r#"{"ok": false, "error_code": 400, "description": "Bad Request: message is not modified"}"#,
        )
        .unwrap_err();
        assert!(matches!(err, StockError::TelegramError(msg) if msg.contains("not modified")));

        let err = decode_response::<Value>(
            "sendMessage",
            StatusCode::TOO_MANY_REQUESTS,
            r#"{"ok": false, "error_code": 429, "parameters": {"retry_after": 3}}"#,
        )
        .unwrap_err();
        assert!(err.is_transient());
    }

    #[tokio::test]
    #[ignore] // Requires TELEGRAM_BOT_TOKEN and network access
    async fn test_get_me_live() {
        let config = TelegramConfig::from_env().unwrap();
        let client = TelegramClient::new(&config).unwrap();
        let me = client.get_me().await.unwrap();
        assert!(me.id > 0);
    }
}
