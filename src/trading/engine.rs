//! Decision engine: one evaluation cycle from bars to an order intent.
//!
//! bars -> band -> signal machine -> levels -> validator -> sizer -> intent

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::CoreError;
use crate::indicators::BandCalculator;
use crate::models::{BandPoint, Bar, OrderIntent, TradeCandidate};

use super::{
    LevelCalculator, PositionSizer, RiskState, SignalMachine, SignalPhase, TradeValidator,
    TradingConfig,
};

/// What a cycle decided.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum CycleOutcome {
    /// No breakout on the latest bar.
    NoSignal,
    /// A validator check failed.
    Rejected {
        candidate: TradeCandidate,
        reason: String,
    },
    /// Passed validation but sized to nothing.
    NotViable {
        candidate: TradeCandidate,
        reason: String,
    },
    /// Ready for submission.
    Order(OrderIntent),
}

/// Owns the signal and risk state for one symbol.
pub struct DecisionEngine {
    config: TradingConfig,
    band: BandCalculator,
    signals: SignalMachine,
    risk: RiskState,
    levels: LevelCalculator,
    validator: TradeValidator,
    sizer: PositionSizer,
    last_band: Option<BandPoint>,
}

impl DecisionEngine {
    pub fn new(config: TradingConfig) -> Result<Self, CoreError> {
        config.validate()?;

        Ok(Self {
            band: BandCalculator::new(config.sma_period, config.ema_period),
            signals: SignalMachine::new(config.flip_policy),
            risk: RiskState::new(),
            levels: LevelCalculator::new(&config),
            validator: TradeValidator::new(&config),
            sizer: PositionSizer::new(&config),
            last_band: None,
            config,
        })
    }

    pub fn config(&self) -> &TradingConfig {
        &self.config
    }

    /// Bars to request from the market data source each cycle.
    pub fn required_bars(&self) -> usize {
        self.band.required_bars()
    }

    pub fn phase(&self) -> SignalPhase {
        self.signals.phase()
    }

    pub fn risk(&self) -> &RiskState {
        &self.risk
    }

    /// Band point of the last evaluated bar.
    pub fn last_band(&self) -> Option<BandPoint> {
        self.last_band
    }

    /// Record a closed trade's outcome for the circuit breaker.
    pub fn on_trade_closed(&mut self, is_profit: bool) {
        self.risk.on_trade_closed(is_profit);
    }

    /// Run the band and signal stages on the latest bars.
    ///
    /// Bars may arrive in any order; they are sorted by timestamp first. On
    /// any error the signal state is left untouched.
    pub fn next_candidate(&mut self, bars: &[Bar]) -> Result<Option<TradeCandidate>, CoreError> {
        for bar in bars {
            bar.check()?;
        }

        let mut sorted = bars.to_vec();
        sorted.sort_by_key(|b| b.timestamp);

        let (previous, current) = self.band.latest(&sorted)?;
        self.last_band = Some(current);

        debug!(
            close = current.close,
            upper = current.upper(),
            lower = current.lower(),
            width = current.width(),
            prev_upper = previous.upper(),
            prev_lower = previous.lower(),
            "Band values"
        );

        let Some(signal) = self.signals.update(&current)? else {
            return Ok(None);
        };

        let entry = signal.entry_decimal()?;
        self.levels.candidate(signal.direction, entry).map(Some)
    }

    /// Validate and size a candidate against the current balance.
    pub fn plan(&self, candidate: TradeCandidate, balance: Decimal) -> CycleOutcome {
        let validation = self.validator.validate(&candidate, &self.risk);
        if !validation.allowed {
            return CycleOutcome::Rejected {
                candidate,
                reason: validation.reason,
            };
        }

        let sizing = match self
            .sizer
            .calculate(balance, candidate.entry_price, candidate.stop_loss)
        {
            Ok(sizing) => sizing,
            Err(e) => {
                warn!(error = %e, "Sizing aborted");
                return CycleOutcome::NotViable {
                    candidate,
                    reason: e.to_string(),
                };
            }
        };

        if !sizing.is_viable() {
            return CycleOutcome::NotViable {
                candidate,
                reason: format!(
                    "Position size rounds to zero (balance {}, contract size {})",
                    balance, self.config.contract_size
                ),
            };
        }

        let intent = OrderIntent::from_candidate(&candidate, sizing.position_size);
        info!(
            direction = %intent.direction,
            size = %intent.position_size,
            entry = %intent.entry_price,
            stop_loss = %intent.stop_loss,
            take_profit = %intent.take_profit,
            margin = %sizing.margin_used.round_dp(2),
            "Order intent ready"
        );
        CycleOutcome::Order(intent)
    }

    /// Full cycle: [`Self::next_candidate`] then [`Self::plan`].
    pub fn evaluate(&mut self, bars: &[Bar], balance: Decimal) -> Result<CycleOutcome, CoreError> {
        match self.next_candidate(bars)? {
            Some(candidate) => Ok(self.plan(candidate, balance)),
            None => Ok(CycleOutcome::NoSignal),
        }
    }
}
