//! Edge-triggered breakout detection against the band.
//!
//! The machine fires only on the transition from `Inside` to one of the
//! outside phases. Staying outside, or crossing straight to the other side
//! without touching the band, emits nothing under the default policy.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::CoreError;
use crate::models::{BandPoint, Direction};

/// Where the latest close sits relative to the band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalPhase {
    Inside,
    OutsideLong,
    OutsideShort,
}

/// Behaviour when price jumps from one side of the band to the other
/// without closing inside it first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlipPolicy {
    /// Stay in the current phase and stay silent until a close inside.
    HoldUntilReset,
    /// Treat the flip as a new breakout in the other direction.
    Rearm,
}

impl FromStr for FlipPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.to_lowercase().as_str() {
            "hold" | "hold_until_reset" => Ok(Self::HoldUntilReset),
            "rearm" => Ok(Self::Rearm),
            other => anyhow::bail!("Unknown flip policy: {}", other),
        }
    }
}

/// A breakout signal: direction plus the close that triggered it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Signal {
    pub direction: Direction,
    pub entry_price: f64,
    pub timestamp: i64,
}

impl Signal {
    pub fn entry_decimal(&self) -> Result<Decimal, CoreError> {
        Decimal::try_from(self.entry_price).map_err(|e| {
            CoreError::DegenerateInput(format!("entry price {}: {}", self.entry_price, e))
        })
    }
}

/// Close position relative to a band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placement {
    Inside,
    Above,
    Below,
}

/// Transition table. Returns the next phase and the direction to emit.
fn transition(
    phase: SignalPhase,
    placement: Placement,
    policy: FlipPolicy,
) -> (SignalPhase, Option<Direction>) {
    match (phase, placement) {
        (_, Placement::Inside) => (SignalPhase::Inside, None),

        (SignalPhase::Inside, Placement::Above) => {
            (SignalPhase::OutsideLong, Some(Direction::Long))
        }
        (SignalPhase::Inside, Placement::Below) => {
            (SignalPhase::OutsideShort, Some(Direction::Short))
        }

        (SignalPhase::OutsideLong, Placement::Above)
        | (SignalPhase::OutsideShort, Placement::Below) => (phase, None),

        (SignalPhase::OutsideLong, Placement::Below) => match policy {
            FlipPolicy::Rearm => (SignalPhase::OutsideShort, Some(Direction::Short)),
            FlipPolicy::HoldUntilReset => (phase, None),
        },
        (SignalPhase::OutsideShort, Placement::Above) => match policy {
            FlipPolicy::Rearm => (SignalPhase::OutsideLong, Some(Direction::Long)),
            FlipPolicy::HoldUntilReset => (phase, None),
        },
    }
}

/// Process-lifetime breakout state. One instance per symbol, one writer.
#[derive(Debug, Clone)]
pub struct SignalMachine {
    phase: SignalPhase,
    policy: FlipPolicy,
}

impl SignalMachine {
    pub fn new(policy: FlipPolicy) -> Self {
        Self {
            phase: SignalPhase::Inside,
            policy,
        }
    }

    pub fn phase(&self) -> SignalPhase {
        self.phase
    }

    /// Feed the latest band point. The band must be defined.
    pub fn update(&mut self, point: &BandPoint) -> Result<Option<Signal>, CoreError> {
        let (Some(upper), Some(lower)) = (point.upper(), point.lower()) else {
            return Err(CoreError::InsufficientData { have: 0, need: 1 });
        };

        let close = point.close;
        let placement = if close > upper {
            Placement::Above
        } else if close < lower {
            Placement::Below
        } else {
            Placement::Inside
        };

        let previous = self.phase;
        let (next, emitted) = transition(previous, placement, self.policy);
        self.phase = next;

        if previous != SignalPhase::Inside && next == SignalPhase::Inside {
            info!(from = ?previous, close = close, "Price returned inside band, signal reset");
        }

        match emitted {
            Some(direction) => {
                info!(
                    direction = %direction,
                    close = close,
                    upper = upper,
                    lower = lower,
                    "Breakout signal"
                );
                Ok(Some(Signal {
                    direction,
                    entry_price: close,
                    timestamp: point.timestamp,
                }))
            }
            None => {
                if next != SignalPhase::Inside {
                    debug!(phase = ?next, close = close, "Outside band, waiting for reset");
                }
                Ok(None)
            }
        }
    }
}

impl Default for SignalMachine {
    fn default() -> Self {
        Self::new(FlipPolicy::HoldUntilReset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(close: f64, lower: f64, upper: f64) -> BandPoint {
        BandPoint {
            timestamp: 0,
            close,
            sma: Some(lower),
            ema: Some(upper),
        }
    }

    #[test]
    fn test_fires_once_per_excursion() {
        let mut machine = SignalMachine::default();

        let first = machine.update(&point(106.0, 100.0, 105.0)).unwrap();
        assert_eq!(first.map(|s| s.direction), Some(Direction::Long));
        assert_eq!(first.map(|s| s.entry_price), Some(106.0));
        assert_eq!(machine.phase(), SignalPhase::OutsideLong);

        assert_eq!(machine.update(&point(107.0, 100.0, 105.0)).unwrap(), None);
        assert_eq!(machine.update(&point(108.0, 100.0, 105.0)).unwrap(), None);

        // Back inside resets silently
        assert_eq!(machine.update(&point(103.0, 100.0, 105.0)).unwrap(), None);
        assert_eq!(machine.phase(), SignalPhase::Inside);

        let again = machine.update(&point(106.0, 100.0, 105.0)).unwrap();
        assert_eq!(again.map(|s| s.direction), Some(Direction::Long));
    }

    #[test]
    fn test_band_edges_are_inside() {
        let mut machine = SignalMachine::default();
        assert_eq!(machine.update(&point(105.0, 100.0, 105.0)).unwrap(), None);
        assert_eq!(machine.update(&point(100.0, 100.0, 105.0)).unwrap(), None);
        assert_eq!(machine.phase(), SignalPhase::Inside);
    }

    #[test]
    fn test_short_breakout() {
        let mut machine = SignalMachine::default();
        let signal = machine.update(&point(99.0, 100.0, 105.0)).unwrap();
        assert_eq!(signal.map(|s| s.direction), Some(Direction::Short));
        assert_eq!(machine.phase(), SignalPhase::OutsideShort);
    }

    #[test]
    fn test_flip_without_reset_is_silent_by_default() {
        let mut machine = SignalMachine::default();
        machine.update(&point(106.0, 100.0, 105.0)).unwrap();

        let flipped = machine.update(&point(95.0, 100.0, 105.0)).unwrap();
        assert_eq!(flipped, None);
        assert_eq!(machine.phase(), SignalPhase::OutsideLong);
    }

    #[test]
    fn test_flip_rearms_when_configured() {
        let mut machine = SignalMachine::new(FlipPolicy::Rearm);
        machine.update(&point(106.0, 100.0, 105.0)).unwrap();

        let flipped = machine.update(&point(95.0, 100.0, 105.0)).unwrap();
        assert_eq!(flipped.map(|s| s.direction), Some(Direction::Short));
        assert_eq!(machine.phase(), SignalPhase::OutsideShort);

        // Staying below does not fire again
        assert_eq!(machine.update(&point(94.0, 100.0, 105.0)).unwrap(), None);
    }

    #[test]
    fn test_undefined_band_is_rejected_without_state_change() {
        let mut machine = SignalMachine::default();
        machine.update(&point(106.0, 100.0, 105.0)).unwrap();

        let undefined = BandPoint {
            timestamp: 0,
            close: 50.0,
            sma: None,
            ema: Some(100.0),
        };
        assert!(machine.update(&undefined).is_err());
        assert_eq!(machine.phase(), SignalPhase::OutsideLong);
    }

    #[test]
    fn test_flip_policy_parsing() {
        assert_eq!("rearm".parse::<FlipPolicy>().unwrap(), FlipPolicy::Rearm);
        assert_eq!("hold".parse::<FlipPolicy>().unwrap(), FlipPolicy::HoldUntilReset);
        assert!("other".parse::<FlipPolicy>().is_err());
    }
}
