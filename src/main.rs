//! Band Breakout Bot
//!
//! Trades a single perpetual on SMA/EMA band breakouts with fixed-fraction
//! risk, a hard per-position margin cap and a consecutive-loss circuit breaker.

mod api;
mod bot;
mod error;
mod indicators;
mod models;
mod trading;

use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use crate::api::{MarketClient, PaperExchange};
use crate::bot::{Bot, BotConfig};
use crate::error::CoreError;
use crate::trading::{CycleOutcome, DecisionEngine, TradingConfig};

/// Band breakout trading bot CLI.
#[derive(Parser)]
#[command(name = "bandbot")]
#[command(
    about = "Trade SMA/EMA band breakouts with capped, risk-sized positions",
    long_about = None
)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", env = "BANDBOT_LOG_LEVEL")]
    log_level: String,

    /// Attempts per market data request
    #[arg(long, default_value = "3", env = "BANDBOT_MAX_RETRIES")]
    max_retries: u32,

    /// Seconds between market data attempts
    #[arg(long, default_value = "2", env = "BANDBOT_RETRY_DELAY")]
    retry_delay: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Paper-trade the configured symbol on live candles
    Run {
        /// Starting paper balance in quote currency
        #[arg(short, long, default_value = "1000", env = "BANDBOT_BALANCE")]
        balance: f64,

        /// Polling interval in seconds (defaults to the bar length)
        #[arg(short, long)]
        interval: Option<u64>,

        /// Log order intents without opening paper positions
        #[arg(long)]
        dry_run: bool,
    },

    /// Evaluate the latest bars once and print the decision
    Once {
        /// Balance to size against
        #[arg(short, long, default_value = "1000", env = "BANDBOT_BALANCE")]
        balance: f64,
    },

    /// Show current configuration
    Config {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Setup logging
    let log_level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = TradingConfig::from_env().context("Invalid configuration")?;
    let retry_delay = Duration::from_secs(cli.retry_delay);

    match cli.command {
        Commands::Run {
            balance,
            interval,
            dry_run,
        } => {
            let balance = Decimal::try_from(balance).context("Invalid balance")?;
            let poll_interval_secs = interval.unwrap_or_else(|| config.timeframe.seconds());

            info!(
                symbol = %config.symbol,
                timeframe = %config.timeframe,
                balance = %balance,
                interval = poll_interval_secs,
                "Starting paper trading"
            );

            let market = MarketClient::new(config.symbol.clone(), config.timeframe)?
                .with_retry(cli.max_retries, retry_delay);
            let exchange = PaperExchange::new(market, &config, balance);
            let engine = DecisionEngine::new(config)?;

            println!("\n=== Paper Trading Mode ===");
            println!("Symbol:           {}", engine.config().symbol);
            println!("Timeframe:        {}", engine.config().timeframe);
            println!("Balance:          ${}", balance);
            println!("Polling interval: {}s", poll_interval_secs);
            println!("\nThis is SIMULATED trading - no real money involved.");
            println!("Press Ctrl+C to stop.\n");

            let bot_config = BotConfig {
                poll_interval_secs,
                dry_run,
            };
            let mut bot = Bot::new(bot_config, engine, exchange);
            bot.run().await?;

            println!("{}", bot.exchange().stats());
        }

        Commands::Once { balance } => {
            let balance = Decimal::try_from(balance).context("Invalid balance")?;
            let market = MarketClient::new(config.symbol.clone(), config.timeframe)?
                .with_retry(cli.max_retries, retry_delay);
            let mut engine = DecisionEngine::new(config)?;

            let bars = market.get_candles(engine.required_bars()).await?;
            info!(count = bars.len(), "Fetched bars");

            let outcome = engine.evaluate(&bars, balance);

            if let Some(point) = engine.last_band() {
                println!("\n=== {} {} ===", engine.config().symbol, engine.config().timeframe);
                let bar_time = point
                    .time()
                    .map(|t| t.format("%Y-%m-%d %H:%M UTC").to_string())
                    .unwrap_or_else(|| point.timestamp.to_string());
                println!("Bar time:  {}", bar_time);
                println!("Close:     {:.6}", point.close);
                if let (Some(upper), Some(lower)) = (point.upper(), point.lower()) {
                    println!("Upper:     {:.6}", upper);
                    println!("Lower:     {:.6}", lower);
                }
                println!("Phase:     {:?}", engine.phase());
            }

            match outcome {
                Ok(CycleOutcome::NoSignal) => println!("\nDecision:  no breakout"),
                Ok(CycleOutcome::Rejected { candidate, reason }) => {
                    println!("\nDecision:  {} rejected: {}", candidate.direction, reason)
                }
                Ok(CycleOutcome::NotViable { candidate, reason }) => {
                    println!("\nDecision:  {} not viable: {}", candidate.direction, reason)
                }
                Ok(CycleOutcome::Order(intent)) => {
                    println!(
                        "\nDecision:  {} {}",
                        intent.direction.order_side(),
                        intent.position_size
                    );
                    println!("Entry:     {}", intent.entry_price);
                    println!("Stop:      {}", intent.stop_loss);
                    println!("Target:    {}", intent.take_profit);
                    println!("Notional:  {:.2}", intent.notional());
                }
                Err(CoreError::InsufficientData { have, need }) => {
                    println!("\nNot enough bars: have {}, need {}", have, need)
                }
                Err(e) => return Err(e.into()),
            }
        }

        Commands::Config { json: true } => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }

        Commands::Config { json: false } => {
            println!("\n=== Trading Configuration ===\n");
            println!("Market:");
            println!("  Symbol:               {}", config.symbol);
            println!("  Timeframe:            {}", config.timeframe);

            println!("\nIndicators:");
            println!("  SMA Period:           {}", config.sma_period);
            println!("  EMA Period:           {}", config.ema_period);
            println!("  Flip Policy:          {:?}", config.flip_policy);

            println!("\nTrade Parameters:");
            println!("  Stop Loss:            {}%", config.stop_loss_pct * dec!(100));
            println!("  Reward:Risk:          {}", config.reward_risk_ratio);
            println!("  Stop Tolerance:       {}", config.stop_tolerance);

            println!("\nPosition Sizing:");
            println!("  Leverage:             {}x", config.leverage);
            println!("  Max Margin:           ${}", config.max_margin);
            println!("  Risk Per Trade:       {}%", config.risk_per_trade * dec!(100));
            println!("  Contract Size:        {}", config.contract_size);

            println!("\nRisk Management:");
            println!("  Max Consecutive Loss: {}", config.max_consecutive_losses);
            println!("  Paper Fee Rate:       {}%", config.fee_rate * dec!(100));

            println!("\nMarket Data:");
            println!("  Max Retries:          {}", cli.max_retries);
            println!("  Retry Delay:          {}s", cli.retry_delay);
        }
    }

    Ok(())
}
