//! Trade direction, per-cycle trade candidate and the order intent handed to execution.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Direction of a breakout trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Long => "long",
            Direction::Short => "short",
        }
    }

    /// Exchange order side that opens a position in this direction.
    pub fn order_side(&self) -> &'static str {
        match self {
            Direction::Long => "buy",
            Direction::Short => "sell",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Entry, stop and target derived from a signal. Lives for one cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeCandidate {
    pub direction: Direction,
    pub entry_price: Decimal,
    pub stop_loss: Decimal,
    pub take_profit: Decimal,
}

impl TradeCandidate {
    /// Absolute distance from entry to stop.
    pub fn stop_distance(&self) -> Decimal {
        (self.entry_price - self.stop_loss).abs()
    }

    /// Absolute distance from entry to target.
    pub fn target_distance(&self) -> Decimal {
        (self.take_profit - self.entry_price).abs()
    }

    /// Realized reward:risk of the levels, zero when the stop sits on the entry.
    pub fn reward_risk(&self) -> Decimal {
        let risk = self.stop_distance();
        if risk.is_zero() {
            return Decimal::ZERO;
        }
        self.target_distance() / risk
    }
}

/// A validated, sized order ready for the execution collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderIntent {
    pub direction: Direction,
    pub position_size: Decimal,
    pub entry_price: Decimal,
    pub stop_loss: Decimal,
    pub take_profit: Decimal,
}

impl OrderIntent {
    pub fn from_candidate(candidate: &TradeCandidate, position_size: Decimal) -> Self {
        Self {
            direction: candidate.direction,
            position_size,
            entry_price: candidate.entry_price,
            stop_loss: candidate.stop_loss,
            take_profit: candidate.take_profit,
        }
    }

    /// Notional value of the order in quote currency.
    pub fn notional(&self) -> Decimal {
        self.position_size * self.entry_price
    }
}
