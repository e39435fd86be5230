//! NSE value-stock screener bot
//!
//! # Usage
//!
//! ```bash
//! # Run the Telegram bot
//! export TELEGRAM_BOT_TOKEN="123456:ABC..."
//! cargo run --bin stock-bot -p stock-screener -- run
//!
//! # One-off scan printed to the terminal
//! cargo run --bin stock-bot -p stock-screener -- scan --limit 5
//! ```

use clap::{Parser, Subcommand};
use comfy_table::{ContentArrangement, Table, presets::UTF8_FULL};
use screener_utils::Config;
use std::sync::Arc;
use stock_screener::bot::BotConfig;
use stock_screener::platforms::{TelegramBot, TelegramConfig};
use stock_screener::{
    BatchScanner, Candidate, NseSymbolSource, ScreenerConfig, TracingDiagnostics,
    YahooFinanceClient,
};

#[derive(Parser, Debug)]
#[command(name = "stock-bot")]
#[command(about = "Screens NSE stocks and posts picks to Telegram", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the Telegram bot until interrupted
    Run,
    /// Run one scan and print the ranked list
    Scan {
        /// Number of stocks to return
        #[arg(short, long)]
        limit: Option<usize>,

        /// Print candidates as JSON instead of a table
        #[arg(long)]
        json: bool,

        /// Also print the analysis report for each candidate
        #[arg(long)]
        reports: bool,
    },
}

fn build_scanner(config: ScreenerConfig) -> anyhow::Result<BatchScanner> {
    let diagnostics = TracingDiagnostics::shared();
    let source = Arc::new(NseSymbolSource::new(&config, diagnostics.clone())?);
    let provider = Arc::new(YahooFinanceClient::new(&config)?);
    Ok(BatchScanner::new(source, provider, config, diagnostics))
}

fn print_table(candidates: &[Candidate]) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["#", "Symbol", "Name", "Price", "P/E", "Vol %", "Mcap"]);

    for (rank, candidate) in candidates.iter().enumerate() {
        table.add_row(vec![
            (rank + 1).to_string(),
            candidate.symbol.to_string(),
            candidate.name.clone(),
            format!("{:.2}", candidate.price),
            format!("{:.2}", candidate.pe),
            format!("{:.1}", candidate.volatility),
            candidate.market_cap_display.clone(),
        ]);
    }

    println!("{table}");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    screener_utils::init_tracing_with(&Config::from_env()?);

    let cli = Cli::parse();
    let config = ScreenerConfig::from_env()?;

    match cli.command {
        Commands::Run => {
            let telegram = TelegramConfig::from_env()?;
            let bot_config = BotConfig::builder()
                .default_limit(config.default_limit)
                .build();
            let scanner = Arc::new(build_scanner(config)?);

            let bot = TelegramBot::connect(telegram, scanner, bot_config).await?;

            tokio::select! {
                result = bot.run() => result?,
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Shutting down");
                }
            }
        }
        Commands::Scan {
            limit,
            json,
            reports,
        } => {
            let limit = limit.unwrap_or(config.default_limit);
            let scanner = build_scanner(config)?;
            let candidates = scanner.scan(limit).await;

            if json {
                println!("{}", serde_json::to_string_pretty(&candidates)?);
            } else if candidates.is_empty() {
                println!("No qualifying stocks found.");
            } else {
                print_table(&candidates);
            }

            if reports {
                for candidate in &candidates {
                    println!("\n{}", stock_screener::report::generate_analysis(candidate));
                }
            }
        }
    }

    Ok(())
}
