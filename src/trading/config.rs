//! Trading configuration.

use std::str::FromStr;

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

use super::FlipPolicy;

/// Candle interval the bot trades on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "1m")]
    M1,
    #[serde(rename = "5m")]
    M5,
    #[serde(rename = "15m")]
    M15,
    #[serde(rename = "30m")]
    M30,
    #[serde(rename = "1h")]
    H1,
    #[serde(rename = "4h")]
    H4,
    #[serde(rename = "1d")]
    D1,
}

impl Timeframe {
    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::M1 => "1m",
            Timeframe::M5 => "5m",
            Timeframe::M15 => "15m",
            Timeframe::M30 => "30m",
            Timeframe::H1 => "1h",
            Timeframe::H4 => "4h",
            Timeframe::D1 => "1d",
        }
    }

    /// Bar code expected by the exchange candles endpoint.
    pub fn exchange_bar(&self) -> &'static str {
        match self {
            Timeframe::H1 => "1H",
            Timeframe::H4 => "4H",
            Timeframe::D1 => "1D",
            other => other.as_str(),
        }
    }

    /// Length of one bar, which is also the polling cadence.
    pub fn seconds(&self) -> u64 {
        match self {
            Timeframe::M1 => 60,
            Timeframe::M5 => 300,
            Timeframe::M15 => 900,
            Timeframe::M30 => 1800,
            Timeframe::H1 => 3600,
            Timeframe::H4 => 14400,
            Timeframe::D1 => 86400,
        }
    }
}

impl FromStr for Timeframe {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "1m" => Ok(Self::M1),
            "5m" => Ok(Self::M5),
            "15m" => Ok(Self::M15),
            "30m" => Ok(Self::M30),
            "1h" => Ok(Self::H1),
            "4h" => Ok(Self::H4),
            "1d" => Ok(Self::D1),
            other => anyhow::bail!("Unsupported timeframe: {}", other),
        }
    }
}

impl std::fmt::Display for Timeframe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration for signal generation, validation and position sizing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradingConfig {
    /// Instrument id on the exchange (e.g. "XRP-USDT")
    pub symbol: String,

    /// Candle interval
    pub timeframe: Timeframe,

    /// Simple moving average window (bars)
    pub sma_period: usize,

    /// Exponential moving average span (bars)
    pub ema_period: usize,

    /// Leverage applied to positions
    pub leverage: u32,

    /// Maximum margin a single position may lock, in quote currency
    pub max_margin: Decimal,

    /// Fraction of balance risked per trade (0.0 to 1.0)
    pub risk_per_trade: Decimal,

    /// Stop distance as a fraction of entry (e.g. 0.01 = 1%)
    pub stop_loss_pct: Decimal,

    /// Take-profit distance as a multiple of the stop distance
    pub reward_risk_ratio: Decimal,

    /// Losing trades in a row before new entries are halted
    pub max_consecutive_losses: u32,

    /// Relative tolerance on the stop distance check
    pub stop_tolerance: Decimal,

    /// Smallest tradable position increment (base units)
    pub contract_size: Decimal,

    /// What to do when price flips sides without returning inside the band
    pub flip_policy: FlipPolicy,

    /// Fee rate charged by the paper venue on entry and exit (0.0 to 1.0)
    pub fee_rate: Decimal,
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            symbol: "XRP-USDT".to_string(),
            timeframe: Timeframe::M5,
            sma_period: 21,
            ema_period: 34,
            leverage: 3,
            max_margin: dec!(100),            // $100 per position
            risk_per_trade: dec!(0.01),       // 1% of balance
            stop_loss_pct: dec!(0.01),        // 1% stop
            reward_risk_ratio: dec!(2),       // 2:1 target
            max_consecutive_losses: 3,
            stop_tolerance: dec!(0.0001),     // 0.01%
            contract_size: dec!(0.01),
            flip_policy: FlipPolicy::HoldUntilReset,
            fee_rate: dec!(0.0006),           // 0.06% taker
        }
    }
}

impl TradingConfig {
    /// Defaults overlaid with `BANDBOT_*` environment variables.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let config = Self {
            symbol: std::env::var("BANDBOT_SYMBOL").unwrap_or(defaults.symbol),
            timeframe: env_or("BANDBOT_TIMEFRAME", defaults.timeframe)?,
            sma_period: env_or("BANDBOT_SMA_PERIOD", defaults.sma_period)?,
            ema_period: env_or("BANDBOT_EMA_PERIOD", defaults.ema_period)?,
            leverage: env_or("BANDBOT_LEVERAGE", defaults.leverage)?,
            max_margin: env_or("BANDBOT_MAX_MARGIN", defaults.max_margin)?,
            risk_per_trade: env_or("BANDBOT_RISK_PER_TRADE", defaults.risk_per_trade)?,
            stop_loss_pct: env_or("BANDBOT_STOP_LOSS_PCT", defaults.stop_loss_pct)?,
            reward_risk_ratio: env_or("BANDBOT_REWARD_RISK", defaults.reward_risk_ratio)?,
            max_consecutive_losses: env_or(
                "BANDBOT_MAX_CONSECUTIVE_LOSSES",
                defaults.max_consecutive_losses,
            )?,
            stop_tolerance: env_or("BANDBOT_STOP_TOLERANCE", defaults.stop_tolerance)?,
            contract_size: env_or("BANDBOT_CONTRACT_SIZE", defaults.contract_size)?,
            flip_policy: env_or("BANDBOT_FLIP_POLICY", defaults.flip_policy)?,
            fee_rate: env_or("BANDBOT_FEE_RATE", defaults.fee_rate)?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject values the core cannot work with.
    pub fn validate(&self) -> Result<(), CoreError> {
        let invalid = |msg: &str| Err(CoreError::InvalidConfig(msg.to_string()));

        if self.symbol.is_empty() {
            return invalid("symbol must not be empty");
        }
        if self.sma_period == 0 || self.ema_period == 0 {
            return invalid("moving average periods must be at least 1");
        }
        if self.leverage == 0 {
            return invalid("leverage must be at least 1");
        }
        if self.max_margin <= Decimal::ZERO {
            return invalid("max margin must be positive");
        }
        if self.contract_size <= Decimal::ZERO {
            return invalid("contract size must be positive");
        }
        if self.risk_per_trade <= Decimal::ZERO || self.risk_per_trade > Decimal::ONE {
            return invalid("risk per trade must be in (0, 1]");
        }
        if self.stop_loss_pct <= Decimal::ZERO || self.stop_loss_pct >= Decimal::ONE {
            return invalid("stop loss pct must be in (0, 1)");
        }
        if self.reward_risk_ratio <= Decimal::ZERO {
            return invalid("reward:risk ratio must be positive");
        }
        // A short target below zero would be unreachable.
        if self.stop_loss_pct * self.reward_risk_ratio >= Decimal::ONE {
            return invalid("stop loss pct times reward:risk must be below 1");
        }
        if self.stop_tolerance < Decimal::ZERO {
            return invalid("stop tolerance must not be negative");
        }
        if self.fee_rate < Decimal::ZERO || self.fee_rate >= Decimal::ONE {
            return invalid("fee rate must be in [0, 1)");
        }

        Ok(())
    }

    pub fn leverage_decimal(&self) -> Decimal {
        Decimal::from(self.leverage)
    }
}

fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| anyhow::anyhow!("{}", e))
            .with_context(|| format!("Invalid {}: {:?}", key, raw)),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = TradingConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.sma_period, 21);
        assert_eq!(config.ema_period, 34);
        assert_eq!(config.leverage_decimal(), dec!(3));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = TradingConfig {
            contract_size: Decimal::ZERO,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(CoreError::InvalidConfig(_))));

        let config = TradingConfig {
            stop_loss_pct: dec!(0.4),
            reward_risk_ratio: dec!(3),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_timeframe_parsing() {
        assert_eq!("1H".parse::<Timeframe>().unwrap(), Timeframe::H1);
        assert_eq!(Timeframe::H4.exchange_bar(), "4H");
        assert_eq!(Timeframe::M15.exchange_bar(), "15m");
        assert_eq!(Timeframe::M5.seconds(), 300);
        assert!("2m".parse::<Timeframe>().is_err());
    }
}
