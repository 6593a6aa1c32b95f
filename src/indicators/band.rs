//! Two-line band built from a simple and an exponential moving average.
//!
//! SMA[i] = mean(close[i-n+1..=i]), defined once `n` closes exist.
//! EMA[i] = alpha * close[i] + (1 - alpha) * EMA[i-1], alpha = 2 / (span + 1),
//! seeded with the first close. The recursion runs from the first bar, but a
//! value is only reported once `span` closes have accumulated.
//! Upper/lower = max/min of the two averages.

use statrs::statistics::Statistics;

use crate::error::CoreError;
use crate::models::{BandPoint, Bar};

/// Simple moving average of closes. `None` until the window is full.
pub fn sma_series(bars: &[Bar], period: usize) -> Vec<Option<f64>> {
    (0..bars.len())
        .map(|i| {
            if period == 0 || i + 1 < period {
                return None;
            }
            Some(bars[i + 1 - period..=i].iter().map(|b| b.close).mean())
        })
        .collect()
}

/// Exponential moving average of closes (recursive form seeded with the
/// first close). Values before the `span`-th close are withheld.
pub fn ema_series(bars: &[Bar], span: usize) -> Vec<Option<f64>> {
    let alpha = 2.0 / (span as f64 + 1.0);
    let mut prev: Option<f64> = None;

    bars.iter()
        .enumerate()
        .map(|(i, bar)| {
            let ema = match prev {
                None => bar.close,
                Some(p) => alpha * bar.close + (1.0 - alpha) * p,
            };
            prev = Some(ema);

            if span > 0 && i + 1 >= span {
                Some(ema)
            } else {
                None
            }
        })
        .collect()
}

/// Computes band points for an ascending bar sequence.
#[derive(Debug, Clone, Copy)]
pub struct BandCalculator {
    sma_period: usize,
    ema_span: usize,
}

impl BandCalculator {
    pub fn new(sma_period: usize, ema_span: usize) -> Self {
        Self {
            sma_period,
            ema_span,
        }
    }

    /// Bars needed for a mature band at the latest bar and the one before it.
    pub fn required_bars(&self) -> usize {
        self.sma_period.max(self.ema_span) + 1
    }

    /// Band point for every bar. Bars must already be sorted by timestamp.
    pub fn compute(&self, bars: &[Bar]) -> Vec<BandPoint> {
        let sma = sma_series(bars, self.sma_period);
        let ema = ema_series(bars, self.ema_span);

        bars.iter()
            .zip(sma)
            .zip(ema)
            .map(|((bar, sma), ema)| BandPoint {
                timestamp: bar.timestamp,
                close: bar.close,
                sma,
                ema,
            })
            .collect()
    }

    /// The previous and current band points, both guaranteed defined.
    pub fn latest(&self, bars: &[Bar]) -> Result<(BandPoint, BandPoint), CoreError> {
        let need = self.required_bars();
        if bars.len() < need {
            return Err(CoreError::InsufficientData {
                have: bars.len(),
                need,
            });
        }

        let points = self.compute(bars);
        let current = points[points.len() - 1];
        let previous = points[points.len() - 2];

        if !current.is_defined() || !previous.is_defined() {
            return Err(CoreError::InsufficientData {
                have: bars.len(),
                need,
            });
        }

        Ok((previous, current))
    }
}

#[cfg(test)]
pub(crate) fn make_bars(closes: &[f64]) -> Vec<Bar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| Bar::new(i as i64 * 60_000, c, c, c, c, 1.0))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < EPS
    }

    #[test]
    fn test_sma_window() {
        let bars = make_bars(&[10.0, 11.0, 12.0, 13.0, 14.0]);
        let sma = sma_series(&bars, 3);

        assert_eq!(sma[0], None);
        assert_eq!(sma[1], None);
        assert!(approx(sma[2].unwrap(), 11.0));
        assert!(approx(sma[3].unwrap(), 12.0));
        assert!(approx(sma[4].unwrap(), 13.0));
    }

    #[test]
    fn test_ema_seeded_with_first_close() {
        let bars = make_bars(&[10.0, 20.0, 20.0, 20.0]);
        // span 3 -> alpha 0.5
        let ema = ema_series(&bars, 3);

        assert_eq!(ema[0], None);
        assert_eq!(ema[1], None);
        // 10 -> 15 -> 17.5
        assert!(approx(ema[2].unwrap(), 17.5));
        assert!(approx(ema[3].unwrap(), 18.75));
    }

    #[test]
    fn test_band_is_max_min_of_averages() {
        let bars = make_bars(&[10.0, 20.0, 20.0, 20.0]);
        let calc = BandCalculator::new(3, 3);
        let points = calc.compute(&bars);

        let last = points[3];
        // SMA = 20, EMA = 18.75
        assert!(approx(last.upper().unwrap(), 20.0));
        assert!(approx(last.lower().unwrap(), 18.75));
        assert!(!points[1].is_defined());
    }

    #[test]
    fn test_latest_requires_one_extra_bar() {
        let calc = BandCalculator::new(3, 5);
        assert_eq!(calc.required_bars(), 6);

        let short = make_bars(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(
            calc.latest(&short),
            Err(CoreError::InsufficientData { have: 5, need: 6 })
        );

        let enough = make_bars(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let (previous, current) = calc.latest(&enough).unwrap();
        assert!(previous.is_defined());
        assert!(current.is_defined());
        assert_eq!(current.timestamp, 5 * 60_000);
    }

    #[test]
    fn test_compute_is_idempotent() {
        let bars = make_bars(&[3.0, 1.0, 4.0, 1.0, 5.0, 9.0, 2.0, 6.0, 5.0, 3.0]);
        let calc = BandCalculator::new(4, 3);
        assert_eq!(calc.compute(&bars), calc.compute(&bars));
    }
}
