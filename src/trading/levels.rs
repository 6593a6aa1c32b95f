//! Stop-loss and take-profit derivation from a signal.

use rust_decimal::Decimal;
use tracing::info;

use crate::error::CoreError;
use crate::models::{Direction, TradeCandidate};

use super::TradingConfig;

/// Fixed-percentage stop with a target at `reward_risk_ratio` times the stop distance.
#[derive(Debug, Clone, Copy)]
pub struct LevelCalculator {
    stop_loss_pct: Decimal,
    reward_risk_ratio: Decimal,
}

impl LevelCalculator {
    pub fn new(config: &TradingConfig) -> Self {
        Self {
            stop_loss_pct: config.stop_loss_pct,
            reward_risk_ratio: config.reward_risk_ratio,
        }
    }

    pub fn stop_loss(&self, direction: Direction, entry_price: Decimal) -> Decimal {
        match direction {
            Direction::Long => entry_price * (Decimal::ONE - self.stop_loss_pct),
            Direction::Short => entry_price * (Decimal::ONE + self.stop_loss_pct),
        }
    }

    pub fn take_profit(&self, direction: Direction, entry_price: Decimal) -> Decimal {
        let target_pct = self.stop_loss_pct * self.reward_risk_ratio;
        match direction {
            Direction::Long => entry_price * (Decimal::ONE + target_pct),
            Direction::Short => entry_price * (Decimal::ONE - target_pct),
        }
    }

    /// Build the trade candidate for a signal.
    pub fn candidate(
        &self,
        direction: Direction,
        entry_price: Decimal,
    ) -> Result<TradeCandidate, CoreError> {
        if entry_price <= Decimal::ZERO {
            return Err(CoreError::DegenerateInput(format!(
                "entry price must be positive, got {}",
                entry_price
            )));
        }

        let candidate = TradeCandidate {
            direction,
            entry_price,
            stop_loss: self.stop_loss(direction, entry_price),
            take_profit: self.take_profit(direction, entry_price),
        };

        info!(
            direction = %direction,
            entry = %candidate.entry_price,
            stop_loss = %candidate.stop_loss,
            take_profit = %candidate.take_profit,
            reward_risk = %candidate.reward_risk().round_dp(2),
            "Calculated trade levels"
        );

        Ok(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn calculator() -> LevelCalculator {
        LevelCalculator::new(&TradingConfig::default())
    }

    #[test]
    fn test_long_levels() {
        let candidate = calculator().candidate(Direction::Long, dec!(100)).unwrap();
        assert_eq!(candidate.stop_loss, dec!(99));
        assert_eq!(candidate.take_profit, dec!(102));
        assert_eq!(candidate.reward_risk(), dec!(2));
    }

    #[test]
    fn test_short_levels() {
        let candidate = calculator().candidate(Direction::Short, dec!(250)).unwrap();
        assert_eq!(candidate.stop_loss, dec!(252.5));
        assert_eq!(candidate.take_profit, dec!(245));
    }

    #[test]
    fn test_non_positive_entry_is_degenerate() {
        let calc = calculator();
        assert!(matches!(
            calc.candidate(Direction::Long, Decimal::ZERO),
            Err(CoreError::DegenerateInput(_))
        ));
        assert!(matches!(
            calc.candidate(Direction::Short, dec!(-1)),
            Err(CoreError::DegenerateInput(_))
        ));
    }

    #[test]
    fn test_custom_ratio() {
        let config = TradingConfig {
            stop_loss_pct: dec!(0.02),
            reward_risk_ratio: dec!(3),
            ..Default::default()
        };
        let candidate = LevelCalculator::new(&config)
            .candidate(Direction::Long, dec!(50))
            .unwrap();
        assert_eq!(candidate.stop_loss, dec!(49));
        assert_eq!(candidate.take_profit, dec!(53));
    }
}
