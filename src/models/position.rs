//! Simulated position held by the paper venue and the outcome it closes with.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Direction;

/// Open position on the paper venue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperPosition {
    /// Paper order id
    pub id: String,

    pub direction: Direction,

    /// Position size in base units
    pub size: Decimal,

    pub entry_price: Decimal,
    pub stop_loss: Decimal,
    pub take_profit: Decimal,

    /// Margin locked for the position
    pub margin: Decimal,

    /// Fee paid on entry
    pub entry_fee: Decimal,

    /// Timestamp (ms) of the last bar seen when the position opened.
    /// Only later bars can trigger its exit.
    pub opened_bar: i64,

    pub opened_at: DateTime<Utc>,
}

impl PaperPosition {
    /// Gross P&L if the position were closed at `price`.
    pub fn pnl_at(&self, price: Decimal) -> Decimal {
        match self.direction {
            Direction::Long => (price - self.entry_price) * self.size,
            Direction::Short => (self.entry_price - price) * self.size,
        }
    }

    /// Exit triggered by a bar's range, if any. The stop wins when a single
    /// bar spans both levels.
    pub fn exit_hit(&self, high: Decimal, low: Decimal) -> Option<(ExitReason, Decimal)> {
        let (stop_hit, target_hit) = match self.direction {
            Direction::Long => (low <= self.stop_loss, high >= self.take_profit),
            Direction::Short => (high >= self.stop_loss, low <= self.take_profit),
        };

        if stop_hit {
            Some((ExitReason::StopLoss, self.stop_loss))
        } else if target_hit {
            Some((ExitReason::TakeProfit, self.take_profit))
        } else {
            None
        }
    }
}

/// Why a position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitReason {
    StopLoss,
    TakeProfit,
}

impl std::fmt::Display for ExitReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExitReason::StopLoss => f.write_str("stop loss"),
            ExitReason::TakeProfit => f.write_str("take profit"),
        }
    }
}

/// Outcome of a closed trade, fed back into the circuit breaker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClosedTrade {
    pub id: String,
    pub direction: Direction,
    pub size: Decimal,
    pub entry_price: Decimal,
    pub exit_price: Decimal,
    /// Net of fees
    pub pnl: Decimal,
    pub exit_reason: ExitReason,
    pub closed_at: DateTime<Utc>,
}

impl ClosedTrade {
    pub fn is_profit(&self) -> bool {
        self.pnl > Decimal::ZERO
    }
}
