//! Command parsing for the screener bot

use crate::error::{Result, StockError};

/// Parsed command from a chat message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Greeting and command list
    Start,
    /// Same text as `/start`
    Help,
    /// Run a scan and post the ranked list
    Stocks { limit: Option<usize> },
}

impl Command {
    /// Parse a chat message
    ///
    /// Returns `Ok(None)` for plain text, unknown commands and commands
    /// addressed to another bot (`/stocks@OtherBot`).
    pub fn parse(input: &str, bot_username: Option<&str>) -> Result<Option<Self>> {
        let input = input.trim();

        let Some(body) = input.strip_prefix('/') else {
            return Ok(None);
        };

        let mut parts = body.split_whitespace();
        let Some(head) = parts.next() else {
            return Ok(None);
        };

        let (name, mention) = match head.split_once('@') {
            Some((name, mention)) => (name, Some(mention)),
            None => (head, None),
        };

        if let (Some(mention), Some(username)) = (mention, bot_username) {
            if !mention.eq_ignore_ascii_case(username.trim_start_matches('@')) {
                return Ok(None);
            }
        }

        let command = match name.to_lowercase().as_str() {
            "start" => Command::Start,
            "help" => Command::Help,
            "stocks" => {
                let limit = parts.next().map(parse_limit).transpose()?;
                Command::Stocks { limit }
            }
            _ => return Ok(None),
        };

        Ok(Some(command))
    }

    /// Welcome text sent for `/start` and `/help`
    pub fn help_text() -> &'static str {
        "📈 <b>Stock Analysis Bot</b> 📉\n\n\
         Available commands:\n\
         /stocks - Get top stock picks\n\
         /stocks &lt;n&gt; - Get the top n picks\n\
         /help - Show this message"
    }

    /// Get a short description of the command
    pub fn description(&self) -> &'static str {
        match self {
            Command::Start => "Show the welcome message",
            Command::Help => "Show help",
            Command::Stocks { .. } => "Scan for top stock picks",
        }
    }
}

fn parse_limit(raw: &str) -> Result<usize> {
    match raw.parse::<usize>() {
        Ok(0) => Err(StockError::CommandError(
            "Limit must be at least 1".to_string(),
        )),
        Ok(limit) => Ok(limit),
        Err(_) => Err(StockError::CommandError(format!(
            "Invalid limit: {raw}"
        ))),
    }
}
