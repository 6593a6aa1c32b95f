//! Position sizing: fixed-fraction risk per trade, capped by a margin budget
//! and rounded down to the contract granularity.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::CoreError;

use super::TradingConfig;

/// Output of the sizer. A zero `position_size` means "do not trade".
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SizingResult {
    /// Final size in base units, a multiple of the contract size
    pub position_size: Decimal,

    /// Margin the final size locks at the configured leverage
    pub margin_used: Decimal,

    /// Whole contracts in the final size
    pub contracts: u64,

    /// Size implied by risking the configured fraction of balance
    pub risk_qty: Decimal,

    /// Largest size the margin budget allows
    pub margin_cap_qty: Decimal,
}

impl SizingResult {
    pub fn is_viable(&self) -> bool {
        self.position_size > Decimal::ZERO
    }
}

/// Calculator for risk-bounded position sizes.
#[derive(Debug, Clone)]
pub struct PositionSizer {
    leverage: Decimal,
    max_margin: Decimal,
    risk_per_trade: Decimal,
    contract_size: Decimal,
}

impl PositionSizer {
    pub fn new(config: &TradingConfig) -> Self {
        Self {
            leverage: config.leverage_decimal(),
            max_margin: config.max_margin,
            risk_per_trade: config.risk_per_trade,
            contract_size: config.contract_size,
        }
    }

    /// Calculate the position size for a trade.
    ///
    /// # Arguments
    /// * `balance` - Account balance in quote currency
    /// * `entry_price` - Expected fill price
    /// * `stop_loss` - Stop price; its distance from entry is the per-unit risk
    ///
    /// # Errors
    /// `DegenerateInput` for a non-positive entry, `DegenerateStopLoss` when
    /// the stop equals the entry.
    pub fn calculate(
        &self,
        balance: Decimal,
        entry_price: Decimal,
        stop_loss: Decimal,
    ) -> Result<SizingResult, CoreError> {
        if entry_price <= Decimal::ZERO {
            return Err(CoreError::DegenerateInput(format!(
                "entry price must be positive, got {}",
                entry_price
            )));
        }

        let margin_cap_qty = self.max_margin * self.leverage / entry_price;

        let risk_amount = balance * self.risk_per_trade;
        let stop_distance = (entry_price - stop_loss).abs();
        if stop_distance.is_zero() {
            return Err(CoreError::DegenerateStopLoss);
        }
        let risk_qty = risk_amount / stop_distance;

        let raw_qty = risk_qty.min(margin_cap_qty);

        let mut contracts = if raw_qty > Decimal::ZERO {
            (raw_qty / self.contract_size).floor()
        } else {
            Decimal::ZERO
        };
        let mut position_size = contracts * self.contract_size;
        let mut margin_used = position_size * entry_price / self.leverage;

        if margin_used > self.max_margin {
            warn!(
                size = %position_size,
                margin = %margin_used,
                budget = %self.max_margin,
                "Size exceeds margin budget, dropping one contract"
            );
            contracts = (contracts - Decimal::ONE).max(Decimal::ZERO);
            position_size = contracts * self.contract_size;
            margin_used = position_size * entry_price / self.leverage;
        }

        info!(
            balance = %balance,
            risk_amount = %risk_amount,
            risk_qty = %risk_qty.round_dp(6),
            margin_cap_qty = %margin_cap_qty.round_dp(6),
            size = %position_size,
            contracts = %contracts,
            margin = %margin_used.round_dp(2),
            "Position sized"
        );

        Ok(SizingResult {
            position_size,
            margin_used,
            contracts: contracts.to_u64().unwrap_or(0),
            risk_qty,
            margin_cap_qty,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sizer() -> PositionSizer {
        PositionSizer::new(&TradingConfig::default())
    }

    #[test]
    fn test_margin_cap_binds() {
        // risk: 10000 * 0.01 / 1 = 100 units; cap: 100 * 3 / 100 = 3 units
        let result = sizer().calculate(dec!(10000), dec!(100), dec!(99)).unwrap();

        assert_eq!(result.risk_qty, dec!(100));
        assert_eq!(result.margin_cap_qty, dec!(3));
        assert_eq!(result.position_size, dec!(3));
        assert_eq!(result.contracts, 300);
        assert_eq!(result.margin_used, dec!(100));
        assert!(result.is_viable());
    }

    #[test]
    fn test_risk_binds_and_rounds_down() {
        // risk: 50 * 0.01 / 1 = 0.5 units; cap 3 units
        let result = sizer().calculate(dec!(50), dec!(100), dec!(99)).unwrap();
        assert_eq!(result.position_size, dec!(0.5));

        // risk: 10 * 0.01 / 0.7 = 0.142857.. -> 0.14
        let result = sizer().calculate(dec!(10), dec!(70), dec!(69.3)).unwrap();
        assert_eq!(result.position_size, dec!(0.14));
        assert_eq!(result.contracts, 14);
    }

    #[test]
    fn test_zero_stop_distance() {
        assert_eq!(
            sizer().calculate(dec!(1000), dec!(100), dec!(100)),
            Err(CoreError::DegenerateStopLoss)
        );
    }

    #[test]
    fn test_non_positive_entry() {
        assert!(matches!(
            sizer().calculate(dec!(1000), Decimal::ZERO, dec!(1)),
            Err(CoreError::DegenerateInput(_))
        ));
    }

    #[test]
    fn test_tiny_balance_sizes_to_zero() {
        let result = sizer().calculate(dec!(0.5), dec!(100), dec!(99)).unwrap();
        assert_eq!(result.position_size, Decimal::ZERO);
        assert_eq!(result.margin_used, Decimal::ZERO);
        assert!(!result.is_viable());

        let result = sizer().calculate(dec!(-100), dec!(100), dec!(99)).unwrap();
        assert_eq!(result.position_size, Decimal::ZERO);
    }

    #[test]
    fn test_size_monotonic_in_balance_then_plateaus() {
        let sizer = sizer();
        let mut last_risk = Decimal::MIN;
        let mut last_size = Decimal::ZERO;

        for balance in (0..=40).map(|i| Decimal::from(i * 50)) {
            let result = sizer.calculate(balance, dec!(100), dec!(99)).unwrap();
            assert!(result.risk_qty >= last_risk);
            assert!(result.position_size >= last_size);
            assert!(result.position_size <= result.margin_cap_qty);
            assert!(result.margin_used <= dec!(100));
            last_risk = result.risk_qty;
            last_size = result.position_size;
        }

        // Cap is 3 units; from balance 300 upward the size plateaus
        assert_eq!(last_size, dec!(3));
        let plateau = sizer.calculate(dec!(300), dec!(100), dec!(99)).unwrap();
        assert_eq!(plateau.position_size, dec!(3));
    }

    #[test]
    fn test_margin_never_exceeds_budget_on_awkward_prices() {
        let sizer = sizer();
        for entry in [dec!(0.3333), dec!(7), dec!(123.456), dec!(2999.99)] {
            let stop = entry * dec!(0.99);
            let result = sizer.calculate(dec!(1000000), entry, stop).unwrap();
            assert!(result.margin_used <= dec!(100), "entry {}", entry);
        }
    }

    #[test]
    fn test_overshoot_from_cap_rounding_drops_one_contract() {
        // 300 / 7 rounds up in its last digit, so a contract size at that
        // digit floors to a size whose margin lands a hair over 100.
        let config = TradingConfig {
            contract_size: dec!(0.00000000000000000000000001),
            ..TradingConfig::default()
        };
        let sizer = PositionSizer::new(&config);

        let result = sizer.calculate(dec!(1000000), dec!(7), dec!(6.93)).unwrap();

        assert!(result.margin_used <= dec!(100), "margin {}", result.margin_used);
        assert!(result.position_size <= result.margin_cap_qty);
        assert!(result.margin_cap_qty - result.position_size <= dec!(0.00000000000000000000000001));
        assert!(result.margin_used > dec!(99.9999999999));
    }
}
