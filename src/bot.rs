//! Bot runner: polls the venue once per bar and drives the decision engine.
//!
//! Each tick:
//! - Fetches the latest bars (the venue marks any open position against them)
//! - Feeds closed trades into the circuit breaker
//! - Skips evaluation while a position is open
//! - Evaluates the band breakout and submits the resulting order

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::time::interval;
use tracing::{debug, error, info, warn};

use crate::api::Exchange;
use crate::error::CoreError;
use crate::trading::{CycleOutcome, DecisionEngine};

/// Bot configuration.
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Seconds between ticks
    pub poll_interval_secs: u64,

    /// Log order intents instead of submitting them
    pub dry_run: bool,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 300,
            dry_run: false,
        }
    }
}

/// Main bot runner.
pub struct Bot<E: Exchange> {
    config: BotConfig,
    engine: DecisionEngine,
    exchange: E,

    cycles: u64,
    signals: u64,
    rejections: u64,
    orders: u64,

    shutdown: Arc<AtomicBool>,
}

impl<E: Exchange> Bot<E> {
    pub fn new(config: BotConfig, engine: DecisionEngine, exchange: E) -> Self {
        Self {
            config,
            engine,
            exchange,
            cycles: 0,
            signals: 0,
            rejections: 0,
            orders: 0,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Get shutdown signal for external control.
    pub fn shutdown_signal(&self) -> Arc<AtomicBool> {
        self.shutdown.clone()
    }

    pub fn engine(&self) -> &DecisionEngine {
        &self.engine
    }

    pub fn exchange(&self) -> &E {
        &self.exchange
    }

    /// Main run loop. Returns once Ctrl+C is received.
    pub async fn run(&mut self) -> Result<()> {
        info!(
            symbol = %self.engine.config().symbol,
            timeframe = %self.engine.config().timeframe,
            dry_run = self.config.dry_run,
            poll_interval = self.config.poll_interval_secs,
            "Starting bot run loop"
        );

        let period = Duration::from_secs(self.config.poll_interval_secs.max(1));
        let mut poll_interval = interval(period);

        let shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            tokio::signal::ctrl_c().await.ok();
            info!("Shutdown signal received");
            shutdown.store(true, Ordering::SeqCst);
        });

        while !self.shutdown.load(Ordering::SeqCst) {
            tokio::select! {
                _ = poll_interval.tick() => {}
                _ = wait_for_shutdown(self.shutdown.clone()) => break,
            }

            if let Err(e) = self.tick().await {
                error!(error = %e, "Error in bot tick");
            }
        }

        info!("Bot stopped");
        println!("{}", self.stats());

        Ok(())
    }

    /// Single iteration of the main loop.
    ///
    /// Returns `None` when the core was not consulted this tick (open
    /// position, or not enough history yet).
    pub async fn tick(&mut self) -> Result<Option<CycleOutcome>> {
        self.cycles += 1;
        debug!(cycle = self.cycles, "Bot tick");

        // 1. Latest bars
        let bars = self.exchange.fetch_bars(self.engine.required_bars()).await?;

        // 2. Outcomes of trades closed since the last tick
        for trade in self.exchange.sync_positions().await? {
            self.engine.on_trade_closed(trade.is_profit());
            info!(
                id = %trade.id,
                direction = %trade.direction,
                reason = %trade.exit_reason,
                pnl = %trade.pnl,
                consecutive_losses = self.engine.risk().consecutive_losses(),
                "Trade closed"
            );
        }

        // 3. One position at a time
        if self.exchange.has_open_position().await? {
            debug!("Position open, skipping evaluation");
            return Ok(None);
        }

        // 4. Band and signal
        let candidate = match self.engine.next_candidate(&bars) {
            Ok(Some(candidate)) => candidate,
            Ok(None) => return Ok(Some(CycleOutcome::NoSignal)),
            Err(CoreError::InsufficientData { have, need }) => {
                warn!(have, need, "Not enough bars for the band yet");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        self.signals += 1;

        // 5. Validate and size
        let balance = self.exchange.fetch_balance().await?;
        let outcome = self.engine.plan(candidate, balance);

        // 6. Submit
        match &outcome {
            CycleOutcome::NoSignal => {}
            CycleOutcome::Rejected { reason, .. } | CycleOutcome::NotViable { reason, .. } => {
                self.rejections += 1;
                info!(reason = %reason, "Signal skipped");
            }
            CycleOutcome::Order(intent) => {
                self.orders += 1;
                if self.config.dry_run {
                    info!(
                        direction = %intent.direction,
                        size = %intent.position_size,
                        entry = %intent.entry_price,
                        "Dry run: order not submitted"
                    );
                } else {
                    let ack = self.exchange.submit_order(intent).await?;
                    info!(
                        order_id = %ack.order_id,
                        side = intent.direction.order_side(),
                        size = %intent.position_size,
                        margin = %ack.margin.round_dp(2),
                        "Order submitted"
                    );
                }
            }
        }

        Ok(Some(outcome))
    }

    pub fn stats(&self) -> BotStats {
        let risk = self.engine.risk();
        let max_losses = self.engine.config().max_consecutive_losses;

        BotStats {
            cycles: self.cycles,
            signals: self.signals,
            rejections: self.rejections,
            orders: self.orders,
            wins: risk.wins(),
            losses: risk.losses(),
            consecutive_losses: risk.consecutive_losses(),
            halted: risk.is_halted(max_losses),
            dry_run: self.config.dry_run,
        }
    }
}

async fn wait_for_shutdown(flag: Arc<AtomicBool>) {
    while !flag.load(Ordering::SeqCst) {
        tokio::time::sleep(Duration::from_millis(250)).await;
    }
}

/// Bot statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct BotStats {
    pub cycles: u64,
    pub signals: u64,
    pub rejections: u64,
    pub orders: u64,
    pub wins: u32,
    pub losses: u32,
    pub consecutive_losses: u32,
    pub halted: bool,
    pub dry_run: bool,
}

impl std::fmt::Display for BotStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Bot Statistics ===")?;
        writeln!(f, "Cycles:             {}", self.cycles)?;
        writeln!(f, "Signals:            {}", self.signals)?;
        writeln!(f, "Rejected:           {}", self.rejections)?;
        writeln!(f, "Orders:             {}", self.orders)?;
        writeln!(f, "Closed Trades:      {} (Wins: {}, Losses: {})",
            self.wins + self.losses, self.wins, self.losses)?;
        writeln!(f, "Consecutive Losses: {}", self.consecutive_losses)?;
        writeln!(f, "Status:             {} {}",
            if self.halted { "Halted" } else { "Active" },
            if self.dry_run { "(Dry Run)" } else { "" })?;
        Ok(())
    }
}
