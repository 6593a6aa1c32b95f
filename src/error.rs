//! Error types for the decision core.
//!
//! Validation rejections are not errors; they come back as
//! validator `Validation` values.

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum CoreError {
    /// Not enough bars for a mature band at the current and previous bar.
    #[error("insufficient data: have {have} bars, need {need}")]
    InsufficientData { have: usize, need: usize },

    /// A bar is missing a field or carries a non-numeric value.
    #[error("invalid bar data: {0}")]
    InvalidBarSchema(String),

    /// Non-positive or unrepresentable price handed to the level calculator.
    #[error("degenerate input: {0}")]
    DegenerateInput(String),

    /// Stop loss sits on the entry price, so risk per unit is zero.
    #[error("degenerate stop loss: zero distance between entry and stop")]
    DegenerateStopLoss,

    #[error("invalid config: {0}")]
    InvalidConfig(String),
}
