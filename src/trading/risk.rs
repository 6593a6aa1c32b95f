//! Consecutive-loss tracking for the circuit breaker.

use serde::Serialize;
use tracing::{info, warn};

/// Process-lifetime trade outcome counters. Written only through
/// [`RiskState::on_trade_closed`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct RiskState {
    consecutive_losses: u32,
    wins: u32,
    losses: u32,
}

impl RiskState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn consecutive_losses(&self) -> u32 {
        self.consecutive_losses
    }

    pub fn wins(&self) -> u32 {
        self.wins
    }

    pub fn losses(&self) -> u32 {
        self.losses
    }

    /// A profit clears the streak; a loss extends it.
    pub fn on_trade_closed(&mut self, is_profit: bool) {
        if is_profit {
            self.wins += 1;
            if self.consecutive_losses > 0 {
                info!(
                    cleared = self.consecutive_losses,
                    "Profitable trade, loss streak reset"
                );
            }
            self.consecutive_losses = 0;
        } else {
            self.losses += 1;
            self.consecutive_losses += 1;
            warn!(
                consecutive_losses = self.consecutive_losses,
                "Losing trade recorded"
            );
        }
    }

    pub fn is_halted(&self, max_consecutive_losses: u32) -> bool {
        self.consecutive_losses >= max_consecutive_losses
    }
}
