//! Pre-trade safety checks.
//!
//! Checks run in order and stop at the first failure:
//! 1. circuit breaker (consecutive losses)
//! 2. one minimum contract fits the margin budget
//! 3. stop and target on the correct sides of the entry
//! 4. stop distance within tolerance of the configured fraction
//!
//! A rejection is a normal outcome, returned as a [`Validation`] value.

use rust_decimal::Decimal;
use tracing::warn;

use crate::models::{Direction, TradeCandidate};

use super::{RiskState, TradingConfig};

/// Result of trade validation.
#[derive(Debug, Clone, PartialEq)]
pub struct Validation {
    pub allowed: bool,
    pub reason: String,
}

impl Validation {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            reason: "Trade parameters valid".to_string(),
        }
    }

    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: reason.into(),
        }
    }
}

/// Validates trade candidates against risk limits and level sanity.
#[derive(Debug, Clone)]
pub struct TradeValidator {
    max_consecutive_losses: u32,
    contract_size: Decimal,
    leverage: Decimal,
    max_margin: Decimal,
    stop_loss_pct: Decimal,
    stop_tolerance: Decimal,
}

impl TradeValidator {
    pub fn new(config: &TradingConfig) -> Self {
        Self {
            max_consecutive_losses: config.max_consecutive_losses,
            contract_size: config.contract_size,
            leverage: config.leverage_decimal(),
            max_margin: config.max_margin,
            stop_loss_pct: config.stop_loss_pct,
            stop_tolerance: config.stop_tolerance,
        }
    }

    pub fn validate(&self, candidate: &TradeCandidate, risk: &RiskState) -> Validation {
        let validation = self.run_checks(candidate, risk);
        if !validation.allowed {
            warn!(
                direction = %candidate.direction,
                entry = %candidate.entry_price,
                reason = %validation.reason,
                "Trade validation failed"
            );
        }
        validation
    }

    fn run_checks(&self, candidate: &TradeCandidate, risk: &RiskState) -> Validation {
        if risk.is_halted(self.max_consecutive_losses) {
            return Validation::deny(format!(
                "Circuit breaker: {} consecutive losses (max {}), trading halted",
                risk.consecutive_losses(),
                self.max_consecutive_losses
            ));
        }

        let entry = candidate.entry_price;

        let min_margin = self.contract_size * entry / self.leverage;
        if min_margin > self.max_margin {
            return Validation::deny(format!(
                "One contract ({}) needs {} margin, above budget {}",
                self.contract_size,
                min_margin.round_dp(2),
                self.max_margin
            ));
        }

        let ordered = match candidate.direction {
            Direction::Long => {
                candidate.stop_loss < entry && entry < candidate.take_profit
            }
            Direction::Short => {
                candidate.take_profit < entry && entry < candidate.stop_loss
            }
        };
        if !ordered {
            return Validation::deny(format!(
                "Invalid price levels for {}: stop {}, entry {}, target {}",
                candidate.direction, candidate.stop_loss, entry, candidate.take_profit
            ));
        }

        let target_distance = entry * self.stop_loss_pct;
        let actual_distance = candidate.stop_distance();
        let drift = (actual_distance - target_distance).abs();
        if drift > target_distance * self.stop_tolerance {
            return Validation::deny(format!(
                "Stop distance {} too far from target {}",
                actual_distance, target_distance
            ));
        }

        Validation::allow()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn long(entry: Decimal, stop: Decimal, target: Decimal) -> TradeCandidate {
        TradeCandidate {
            direction: Direction::Long,
            entry_price: entry,
            stop_loss: stop,
            take_profit: target,
        }
    }

    fn validator() -> TradeValidator {
        TradeValidator::new(&TradingConfig::default())
    }

    #[test]
    fn test_valid_long_and_short() {
        let v = validator();
        let risk = RiskState::new();

        assert!(v.validate(&long(dec!(100), dec!(99), dec!(102)), &risk).allowed);

        let short = TradeCandidate {
            direction: Direction::Short,
            entry_price: dec!(100),
            stop_loss: dec!(101),
            take_profit: dec!(98),
        };
        assert!(v.validate(&short, &risk).allowed);
    }

    #[test]
    fn test_circuit_breaker_rejects_valid_trade() {
        let v = validator();
        let mut risk = RiskState::new();
        for _ in 0..3 {
            risk.on_trade_closed(false);
        }

        let result = v.validate(&long(dec!(100), dec!(99), dec!(102)), &risk);
        assert!(!result.allowed);
        assert!(result.reason.contains("Circuit breaker"));

        risk.on_trade_closed(true);
        assert!(v.validate(&long(dec!(100), dec!(99), dec!(102)), &risk).allowed);
    }

    #[test]
    fn test_minimum_contract_unaffordable() {
        // 0.01 * 40000 / 3 = 133.33 > 100
        let result = validator().validate(
            &long(dec!(40000), dec!(39600), dec!(40800)),
            &RiskState::new(),
        );
        assert!(!result.allowed);
        assert!(result.reason.contains("margin"));
    }

    #[test]
    fn test_price_ordering() {
        let v = validator();
        let risk = RiskState::new();

        // Long with stop above entry
        let result = v.validate(&long(dec!(100), dec!(101), dec!(102)), &risk);
        assert!(!result.allowed);
        assert!(result.reason.contains("Invalid price levels"));

        // Short laid out like a long
        let result = v.validate(
            &TradeCandidate {
                direction: Direction::Short,
                entry_price: dec!(100),
                stop_loss: dec!(99),
                take_profit: dec!(102),
            },
            &risk,
        );
        assert!(!result.allowed);
    }

    #[test]
    fn test_stop_distance_tolerance_boundary() {
        let v = validator();
        let risk = RiskState::new();
        // target distance 1.00, allowed drift 1.00 * 0.0001 = 0.0001

        // Exactly at the edge of the slack
        assert!(v.validate(&long(dec!(100), dec!(98.9999), dec!(102)), &risk).allowed);
        assert!(v.validate(&long(dec!(100), dec!(99.0001), dec!(102)), &risk).allowed);

        // Just past it
        let result = v.validate(&long(dec!(100), dec!(98.9998), dec!(102)), &risk);
        assert!(!result.allowed);
        assert!(result.reason.contains("Stop distance"));

        // 1.03% stop
        assert!(!v.validate(&long(dec!(100), dec!(98.97), dec!(102)), &risk).allowed);
    }

    #[test]
    fn test_checks_short_circuit_in_order() {
        let v = validator();
        let mut risk = RiskState::new();
        for _ in 0..3 {
            risk.on_trade_closed(false);
        }
        // Both halted and mis-ordered: the breaker reason wins
        let result = v.validate(&long(dec!(100), dec!(101), dec!(99)), &risk);
        assert!(result.reason.contains("Circuit breaker"));
    }
}
