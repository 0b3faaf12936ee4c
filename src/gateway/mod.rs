//! Outbound exchange access
//!
//! All candle downloads go through one [`RateLimitedHttpGateway`]. The
//! gateway is a shared, serialized resource: a mutex-guarded last-request
//! instant enforces a minimum delay between consecutive requests regardless
//! of which run issued them. Concurrent backtests contend for it.

use crate::candle::Granularity;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Default exchange REST endpoint
pub const EXCHANGE_API_URL: &str = "https://api.exchange.coinbase.com";

/// User agent sent with every candle request
const USER_AGENT: &str = "coinbt/0.1";

/// One raw candle tuple as the exchange returns it:
/// `[unixTimeSeconds, low, high, open, close, volume]`.
///
/// Entries arrive unordered and buckets with no trades are simply absent.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct RawCandle {
    pub time: i64,
    pub low: Decimal,
    pub high: Decimal,
    pub open: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

/// Source of raw candle data for the cache. The HTTP gateway is the real
/// implementation; tests substitute stubs.
#[async_trait]
pub trait CandleSource: Send + Sync {
    /// Fetch all candles for `[start, end]` at the given granularity
    async fn fetch_candles(
        &self,
        coin: &str,
        granularity: Granularity,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> anyhow::Result<Vec<RawCandle>>;
}

/// Configuration for the rate-limited gateway
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Base URL for the exchange REST API
    pub base_url: String,
    /// Minimum delay between consecutive outbound requests
    pub min_delay: Duration,
    /// Request timeout
    pub timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: EXCHANGE_API_URL.to_string(),
            min_delay: Duration::from_secs(1),
            timeout: Duration::from_secs(10),
        }
    }
}

/// Serializes all outbound exchange requests behind a minimum inter-request
/// delay. Construct once and share by `Arc` with every component that needs
/// outbound access.
pub struct RateLimitedHttpGateway {
    config: GatewayConfig,
    client: Client,
    last_request: Mutex<Option<Instant>>,
}

impl RateLimitedHttpGateway {
    /// Create a gateway with default configuration
    pub fn new() -> Self {
        Self::with_config(GatewayConfig::default())
    }

    /// Create a gateway with custom configuration
    pub fn with_config(config: GatewayConfig) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(USER_AGENT)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            config,
            client,
            last_request: Mutex::new(None),
        }
    }

    /// Build the candle endpoint URL for a coin
    fn candles_url(&self, coin: &str) -> String {
        format!("{}/products/{}-USD/candles", self.config.base_url, coin)
    }

    /// Wait out the remainder of the inter-request delay. The caller must
    /// hold the `last_request` lock so requests stay serialized.
    async fn pace(&self, last: Option<Instant>) {
        if let Some(last) = last {
            let elapsed = last.elapsed();
            if elapsed < self.config.min_delay {
                tokio::time::sleep(self.config.min_delay - elapsed).await;
            }
        }
    }
}

impl Default for RateLimitedHttpGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CandleSource for RateLimitedHttpGateway {
    async fn fetch_candles(
        &self,
        coin: &str,
        granularity: Granularity,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> anyhow::Result<Vec<RawCandle>> {
        let url = self.candles_url(coin);

        // Hold the lock across the request so concurrent callers queue up
        // behind the shared delay instead of racing past it.
        let mut last = self.last_request.lock().await;
        self.pace(*last).await;

        tracing::debug!(
            url = %url,
            granularity = %granularity,
            start = %start,
            end = %end,
            "Fetching candles from exchange"
        );

        let response = self
            .client
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/json")
            .query(&[
                ("granularity", granularity.to_string()),
                ("start", start.to_rfc3339()),
                ("end", end.to_rfc3339()),
            ])
            .send()
            .await?;

        *last = Some(Instant::now());
        drop(last);

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("exchange candle API error: {} - {}", status, body);
        }

        let candles: Vec<RawCandle> = response.json().await?;

        tracing::debug!(candle_count = candles.len(), "Exchange returned candles");

        Ok(candles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_gateway_config_default() {
        let config = GatewayConfig::default();
        assert_eq!(config.base_url, EXCHANGE_API_URL);
        assert_eq!(config.min_delay, Duration::from_secs(1));
        assert_eq!(config.timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_candles_url() {
        let gateway = RateLimitedHttpGateway::new();
        assert_eq!(
            gateway.candles_url("BTC"),
            "https://api.exchange.coinbase.com/products/BTC-USD/candles"
        );
    }

    #[test]
    fn test_candles_url_custom_base() {
        let gateway = RateLimitedHttpGateway::with_config(GatewayConfig {
            base_url: "http://localhost:8080".to_string(),
            ..GatewayConfig::default()
        });
        assert_eq!(
            gateway.candles_url("ETH"),
            "http://localhost:8080/products/ETH-USD/candles"
        );
    }

    #[test]
    fn test_raw_candle_parses_tuple_array() {
        let json = r#"[
            [1704067200, 42000.5, 42500.0, 42100.0, 42400.0, 12.5],
            [1704067260, 42350.0, 42600.0, 42400.0, 42550.0, 8.25]
        ]"#;

        let candles: Vec<RawCandle> = serde_json::from_str(json).unwrap();
        assert_eq!(candles.len(), 2);
        assert_eq!(candles[0].time, 1704067200);
        assert_eq!(candles[0].low, dec!(42000.5));
        assert_eq!(candles[0].high, dec!(42500.0));
        assert_eq!(candles[0].open, dec!(42100.0));
        assert_eq!(candles[0].close, dec!(42400.0));
        assert_eq!(candles[0].volume, dec!(12.5));
    }

    #[test]
    fn test_raw_candle_empty_response() {
        let candles: Vec<RawCandle> = serde_json::from_str("[]").unwrap();
        assert!(candles.is_empty());
    }

    #[test]
    fn test_raw_candle_rejects_short_tuple() {
        let result: Result<Vec<RawCandle>, _> =
            serde_json::from_str("[[1704067200, 42000.5, 42500.0]]");
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_pace_enforces_min_delay() {
        let gateway = RateLimitedHttpGateway::with_config(GatewayConfig {
            min_delay: Duration::from_millis(50),
            ..GatewayConfig::default()
        });

        let before = Instant::now();
        gateway.pace(Some(Instant::now())).await;
        assert!(before.elapsed() >= Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_pace_skips_delay_when_stale() {
        let gateway = RateLimitedHttpGateway::with_config(GatewayConfig {
            min_delay: Duration::from_millis(50),
            ..GatewayConfig::default()
        });

        // First request of the process: no waiting
        let before = Instant::now();
        gateway.pace(None).await;
        assert!(before.elapsed() < Duration::from_millis(20));

        // Last request long enough ago: no waiting either
        let stale = Instant::now() - Duration::from_millis(200);
        let before = Instant::now();
        gateway.pace(Some(stale)).await;
        assert!(before.elapsed() < Duration::from_millis(20));
    }
}
