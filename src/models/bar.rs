//! Price bar (candle) model and the per-bar band values derived from it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// One OHLCV candle. Timestamps are exchange milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    pub fn new(timestamp: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Reject bars carrying NaN or infinite fields.
    pub fn check(&self) -> Result<(), CoreError> {
        let fields = [
            ("open", self.open),
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
            ("volume", self.volume),
        ];

        for (name, value) in fields {
            if !value.is_finite() {
                return Err(CoreError::InvalidBarSchema(format!(
                    "bar {} has non-numeric {}: {}",
                    self.timestamp, name, value
                )));
            }
        }

        Ok(())
    }
}

/// Moving averages and band boundaries at one bar.
///
/// `sma` is `None` until the simple-average window is full and `ema` is
/// `None` until the exponential average has seen `span` closes. The band
/// only exists where both are present.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandPoint {
    pub timestamp: i64,
    pub close: f64,
    pub sma: Option<f64>,
    pub ema: Option<f64>,
}

impl BandPoint {
    /// Open time of the bar this point was computed on.
    pub fn time(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.timestamp)
    }

    /// Upper band: the larger of the two averages.
    pub fn upper(&self) -> Option<f64> {
        Some(self.sma?.max(self.ema?))
    }

    /// Lower band: the smaller of the two averages.
    pub fn lower(&self) -> Option<f64> {
        Some(self.sma?.min(self.ema?))
    }

    pub fn width(&self) -> Option<f64> {
        Some(self.upper()? - self.lower()?)
    }

    pub fn is_defined(&self) -> bool {
        self.sma.is_some() && self.ema.is_some()
    }
}
