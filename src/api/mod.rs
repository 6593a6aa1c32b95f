//! Venue access: BloFin market data, the exchange seam and the paper venue.

mod exchange;
mod market_client;
mod paper;
mod types;

pub use exchange::Exchange;
pub use market_client::MarketClient;
pub use paper::PaperExchange;

#[cfg(test)]
pub(crate) use exchange::OrderAck;
