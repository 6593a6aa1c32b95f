//! BloFin public market client for candle data.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use backoff::backoff::Constant;
use reqwest::{Client, StatusCode};
use tracing::{debug, warn};

use crate::models::Bar;
use crate::trading::Timeframe;

use super::types::CandlesResponse;

const BLOFIN_API_BASE: &str = "https://openapi.blofin.com";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Most rows the candles endpoint returns in one page.
pub const MAX_CANDLES: usize = 1440;

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Read-only client for one instrument's candles.
pub struct MarketClient {
    client: Client,
    base_url: String,
    symbol: String,
    timeframe: Timeframe,
    max_retries: u32,
    retry_delay: Duration,
}

impl MarketClient {
    pub fn new(symbol: impl Into<String>, timeframe: Timeframe) -> Result<Self> {
        Self::with_base_url(BLOFIN_API_BASE.to_string(), symbol, timeframe)
    }

    /// Create with custom base URL (for testing).
    pub fn with_base_url(
        base_url: String,
        symbol: impl Into<String>,
        timeframe: Timeframe,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url,
            symbol: symbol.into(),
            timeframe,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
        })
    }

    pub fn with_retry(mut self, max_retries: u32, retry_delay: Duration) -> Self {
        self.max_retries = max_retries.max(1);
        self.retry_delay = retry_delay;
        self
    }

    /// Fetch the latest `limit` candles, oldest first.
    ///
    /// Network errors, 5xx/429 responses and non-zero envelope codes are
    /// retried with a constant delay up to `max_retries` attempts in total.
    /// Malformed rows fail immediately.
    pub async fn get_candles(&self, limit: usize) -> Result<Vec<Bar>> {
        let attempts = AtomicU32::new(0);
        let attempts = &attempts;
        let this = self;

        backoff::future::retry(Constant::new(self.retry_delay), move || async move {
            let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;

            match this.fetch_candles(limit).await {
                Ok(bars) => Ok(bars),
                Err(backoff::Error::Transient { err, .. }) if attempt < this.max_retries => {
                    warn!(
                        attempt,
                        max_retries = this.max_retries,
                        error = %err,
                        "Candle request failed, retrying"
                    );
                    Err(backoff::Error::transient(err))
                }
                Err(backoff::Error::Transient { err, .. }) => Err(backoff::Error::permanent(
                    err.context(format!("Giving up after {} attempts", attempt)),
                )),
                Err(permanent) => Err(permanent),
            }
        })
        .await
    }

    async fn fetch_candles(&self, limit: usize) -> Result<Vec<Bar>, backoff::Error<anyhow::Error>> {
        let url = format!("{}/api/v1/market/candles", self.base_url);
        let limit = limit.clamp(1, MAX_CANDLES).to_string();

        debug!(
            url = %url,
            symbol = %self.symbol,
            bar = self.timeframe.exchange_bar(),
            limit = %limit,
            "Fetching candles"
        );

        let response = self
            .client
            .get(&url)
            .query(&[
                ("instId", self.symbol.as_str()),
                ("bar", self.timeframe.exchange_bar()),
                ("limit", limit.as_str()),
            ])
            .send()
            .await
            .context("Failed to fetch candles")
            .map_err(backoff::Error::transient)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let err = anyhow!("Candles request failed: {} - {}", status, body);
            return Err(if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
                backoff::Error::transient(err)
            } else {
                backoff::Error::permanent(err)
            });
        }

        let envelope: CandlesResponse = response
            .json()
            .await
            .context("Failed to parse candles response")
            .map_err(backoff::Error::permanent)?;

        if !envelope.is_ok() {
            return Err(backoff::Error::transient(anyhow!(
                "Candles request rejected: code {} - {}",
                envelope.code,
                envelope.msg
            )));
        }

        let bars = envelope
            .into_bars()
            .map_err(|e| backoff::Error::permanent(anyhow::Error::new(e)))?;

        debug!(count = bars.len(), "Retrieved candles");
        Ok(bars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_builds_without_network() {
        let client = MarketClient::new("XRP-USDT", Timeframe::M5)
            .unwrap()
            .with_retry(0, Duration::from_millis(10));

        assert_eq!(client.symbol, "XRP-USDT");
        assert_eq!(client.timeframe, Timeframe::M5);
        assert_eq!(client.max_retries, 1);
    }

    #[tokio::test]
    async fn test_unreachable_host_gives_up() {
        let client = MarketClient::with_base_url(
            "http://127.0.0.1:9".to_string(),
            "XRP-USDT",
            Timeframe::M5,
        )
        .unwrap()
        .with_retry(2, Duration::from_millis(1));

        let err = client.get_candles(10).await.unwrap_err();
        assert!(err.to_string().contains("Giving up after 2 attempts"));
    }
}
