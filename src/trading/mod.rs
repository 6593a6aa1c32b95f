//! Trading logic: breakout signals, trade levels, validation, position sizing.

mod config;
mod engine;
mod levels;
mod position_sizer;
mod risk;
mod signal;
mod validator;

pub use config::{Timeframe, TradingConfig};
pub use engine::{CycleOutcome, DecisionEngine};
pub use levels::LevelCalculator;
pub use position_sizer::PositionSizer;
pub use risk::RiskState;
pub use signal::{FlipPolicy, SignalMachine, SignalPhase};
pub use validator::TradeValidator;
