//! Moving-average band indicators over closing prices.

mod band;

pub use band::BandCalculator;

#[cfg(test)]
pub(crate) use band::make_bars;
