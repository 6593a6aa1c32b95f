//! Data models for bars, band values, trade candidates and positions.

mod bar;
mod position;
mod trade;

pub use bar::{BandPoint, Bar};
pub use position::{ClosedTrade, ExitReason, PaperPosition};
pub use trade::{Direction, OrderIntent, TradeCandidate};
