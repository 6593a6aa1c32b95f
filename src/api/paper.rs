//! Paper venue: live candles, simulated fills.

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::{Bar, ClosedTrade, ExitReason, OrderIntent, PaperPosition};
use crate::trading::TradingConfig;

use super::exchange::{Exchange, OrderAck};
use super::market_client::MarketClient;

/// Simulated single-position account.
///
/// Entries fill at the intent's entry price on the latest bar seen. Only bars
/// after that one are checked against the bracket; the stop wins when one bar
/// touches both.
pub struct PaperExchange {
    market: MarketClient,
    leverage: Decimal,
    fee_rate: Decimal,
    initial_balance: Decimal,
    balance: Decimal,
    position: Option<PaperPosition>,
    pending_closes: Vec<ClosedTrade>,
    completed_trades: Vec<ClosedTrade>,
    /// Newest confirmed bar; bars up to it are never re-checked
    last_bar: i64,
    /// Newest bar seen, possibly still forming
    latest_bar: i64,
    total_fees: Decimal,
    started_at: DateTime<Utc>,
}

impl PaperExchange {
    pub fn new(market: MarketClient, config: &TradingConfig, initial_balance: Decimal) -> Self {
        Self {
            market,
            leverage: config.leverage_decimal(),
            fee_rate: config.fee_rate,
            initial_balance,
            balance: initial_balance,
            position: None,
            pending_closes: Vec::new(),
            completed_trades: Vec::new(),
            last_bar: 0,
            latest_bar: 0,
            total_fees: Decimal::ZERO,
            started_at: Utc::now(),
        }
    }

    pub fn balance(&self) -> Decimal {
        self.balance
    }

    pub fn position(&self) -> Option<&PaperPosition> {
        self.position.as_ref()
    }

    /// Open a position for `intent`. Margin stays in the balance; only the fee
    /// leaves it until the position closes.
    pub fn open(&mut self, intent: &OrderIntent) -> Result<OrderAck> {
        if self.position.is_some() {
            bail!("Paper account already holds a position");
        }
        if intent.position_size <= Decimal::ZERO {
            bail!("Order size must be positive, got {}", intent.position_size);
        }

        let notional = intent.notional();
        let margin = notional / self.leverage;
        let fee = notional * self.fee_rate;

        if margin + fee > self.balance {
            bail!(
                "Insufficient paper balance: need {:.2} (margin {:.2} + fee {:.4}), have {:.2}",
                margin + fee,
                margin,
                fee,
                self.balance
            );
        }

        self.balance -= fee;
        self.total_fees += fee;

        let id = Uuid::new_v4().to_string();
        info!(
            id = %id,
            direction = %intent.direction,
            size = %intent.position_size,
            entry = %intent.entry_price,
            stop_loss = %intent.stop_loss,
            take_profit = %intent.take_profit,
            margin = %margin,
            "Paper position opened"
        );

        self.position = Some(PaperPosition {
            id: id.clone(),
            direction: intent.direction,
            size: intent.position_size,
            entry_price: intent.entry_price,
            stop_loss: intent.stop_loss,
            take_profit: intent.take_profit,
            margin,
            entry_fee: fee,
            opened_bar: self.latest_bar,
            opened_at: Utc::now(),
        });

        Ok(OrderAck { order_id: id, margin, fee })
    }

    /// Mark the open position against bars it has not seen yet.
    pub fn apply_bars(&mut self, bars: &[Bar]) {
        for bar in bars {
            if bar.timestamp <= self.last_bar {
                continue;
            }

            let hit = match &self.position {
                Some(pos) if bar.timestamp > pos.opened_bar => {
                    match (Decimal::try_from(bar.high), Decimal::try_from(bar.low)) {
                        (Ok(high), Ok(low)) => pos.exit_hit(high, low),
                        _ => {
                            warn!(
                                timestamp = bar.timestamp,
                                "Skipping bar with unrepresentable range"
                            );
                            None
                        }
                    }
                }
                _ => None,
            };

            if let Some((reason, price)) = hit {
                self.close(reason, price);
            }
        }

        // The last bar may still be forming; re-check it next time.
        if let Some(latest) = bars.iter().map(|b| b.timestamp).max() {
            let confirmed = bars
                .iter()
                .map(|b| b.timestamp)
                .filter(|ts| *ts < latest)
                .max()
                .unwrap_or(self.last_bar);
            self.last_bar = self.last_bar.max(confirmed);
            self.latest_bar = self.latest_bar.max(latest);
        }
    }

    fn close(&mut self, reason: ExitReason, exit_price: Decimal) {
        let Some(pos) = self.position.take() else {
            return;
        };

        let gross = pos.pnl_at(exit_price);
        let exit_fee = exit_price * pos.size * self.fee_rate;
        let net = gross - exit_fee - pos.entry_fee;

        self.balance += gross - exit_fee;
        self.total_fees += exit_fee;

        info!(
            id = %pos.id,
            reason = %reason,
            exit = %exit_price,
            pnl = %net,
            balance = %self.balance,
            "Paper position closed"
        );

        let trade = ClosedTrade {
            id: pos.id,
            direction: pos.direction,
            size: pos.size,
            entry_price: pos.entry_price,
            exit_price,
            pnl: net,
            exit_reason: reason,
            closed_at: Utc::now(),
        };

        self.completed_trades.push(trade.clone());
        self.pending_closes.push(trade);
    }

    pub fn stats(&self) -> PaperStats {
        let realized: Decimal = self.completed_trades.iter().map(|t| t.pnl).sum();
        let winners = self.completed_trades.iter().filter(|t| t.is_profit()).count();
        let total = self.completed_trades.len();
        let win_rate = if total > 0 { winners as f64 / total as f64 } else { 0.0 };

        PaperStats {
            initial_balance: self.initial_balance,
            balance: self.balance,
            realized_pnl: realized,
            return_pct: if self.initial_balance.is_zero() {
                Decimal::ZERO
            } else {
                (self.balance - self.initial_balance) / self.initial_balance
            },
            open_position: self.position.is_some(),
            completed_trades: total,
            win_rate,
            total_fees: self.total_fees,
            running_since: self.started_at,
        }
    }
}

#[async_trait]
impl Exchange for PaperExchange {
    async fn fetch_bars(&mut self, limit: usize) -> Result<Vec<Bar>> {
        let bars = self.market.get_candles(limit).await?;
        self.apply_bars(&bars);
        Ok(bars)
    }

    async fn fetch_balance(&mut self) -> Result<Decimal> {
        Ok(self.balance)
    }

    async fn has_open_position(&mut self) -> Result<bool> {
        Ok(self.position.is_some())
    }

    async fn submit_order(&mut self, intent: &OrderIntent) -> Result<OrderAck> {
        self.open(intent)
    }

    async fn sync_positions(&mut self) -> Result<Vec<ClosedTrade>> {
        let closed = std::mem::take(&mut self.pending_closes);
        if !closed.is_empty() {
            debug!(count = closed.len(), "Reporting closed paper trades");
        }
        Ok(closed)
    }
}

/// Paper account summary.
#[derive(Debug, Clone)]
pub struct PaperStats {
    pub initial_balance: Decimal,
    pub balance: Decimal,
    pub realized_pnl: Decimal,
    pub return_pct: Decimal,
    pub open_position: bool,
    pub completed_trades: usize,
    pub win_rate: f64,
    pub total_fees: Decimal,
    pub running_since: DateTime<Utc>,
}

impl std::fmt::Display for PaperStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\n{:=^50}", " PAPER TRADING ")?;
        writeln!(f, "Running since: {}", self.running_since.format("%Y-%m-%d %H:%M"))?;
        writeln!(f)?;
        writeln!(f, "Initial Balance:  ${:.2}", self.initial_balance)?;
        writeln!(f, "Balance:          ${:.2}", self.balance)?;
        writeln!(f, "Realized P&L:     ${:.2} ({:.2}%)",
            self.realized_pnl, self.return_pct * dec!(100))?;
        writeln!(f, "Open Position:    {}", if self.open_position { "yes" } else { "no" })?;
        writeln!(f, "Completed Trades: {}", self.completed_trades)?;
        writeln!(f, "Win Rate:         {:.1}%", self.win_rate * 100.0)?;
        writeln!(f, "Total Fees:       ${:.4}", self.total_fees)?;
        writeln!(f, "{:=^50}", "")?;
        Ok(())
    }
}
