//! Venue abstraction the bot loop drives.

use anyhow::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::{Bar, ClosedTrade, OrderIntent};

/// Acknowledgement for a submitted bracket order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderAck {
    pub order_id: String,
    /// Margin the venue locked for the position
    pub margin: Decimal,
    /// Fee charged on entry
    pub fee: Decimal,
}

/// Everything the bot needs from a trading venue.
///
/// Implementations own retries and connection state. The decision core never
/// sees this trait.
#[async_trait]
pub trait Exchange: Send {
    /// Latest `limit` bars, oldest first.
    async fn fetch_bars(&mut self, limit: usize) -> Result<Vec<Bar>>;

    /// Free balance in quote currency.
    async fn fetch_balance(&mut self) -> Result<Decimal>;

    async fn has_open_position(&mut self) -> Result<bool>;

    /// Place an entry with attached stop loss and take profit.
    async fn submit_order(&mut self, intent: &OrderIntent) -> Result<OrderAck>;

    /// Trades that closed since the previous call.
    async fn sync_positions(&mut self) -> Result<Vec<ClosedTrade>>;
}
