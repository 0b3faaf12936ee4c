//! Configuration types for coinbt

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub backtest: BacktestConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Candle cache configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Directory holding one JSON file per cached candle range
    #[serde(default = "default_cache_dir")]
    pub dir: PathBuf,
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("./candle-cache")
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: default_cache_dir(),
        }
    }
}

/// Outbound exchange gateway configuration
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Base URL for the exchange REST API
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Minimum delay between consecutive outbound requests (milliseconds)
    #[serde(default = "default_min_delay_ms")]
    pub min_delay_ms: u64,

    /// Request timeout (seconds)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    crate::gateway::EXCHANGE_API_URL.to_string()
}
fn default_min_delay_ms() -> u64 {
    1000
}
fn default_timeout_secs() -> u64 {
    10
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            min_delay_ms: 1000,
            timeout_secs: 10,
        }
    }
}

impl GatewayConfig {
    /// Convert into the gateway's runtime configuration
    pub fn to_runtime(&self) -> crate::gateway::GatewayConfig {
        crate::gateway::GatewayConfig {
            base_url: self.base_url.clone(),
            min_delay: std::time::Duration::from_millis(self.min_delay_ms),
            timeout: std::time::Duration::from_secs(self.timeout_secs),
        }
    }
}

/// Backtest defaults
#[derive(Debug, Clone, Deserialize)]
pub struct BacktestConfig {
    /// Fee fraction charged on gross trade amounts (0.006 = 0.6%)
    #[serde(default = "default_fee_percent")]
    pub fee_percent: Decimal,

    /// Seed capital in USD
    #[serde(default = "default_initial_usd")]
    pub initial_usd: Decimal,
}

fn default_fee_percent() -> Decimal {
    dec!(0.006)
}
fn default_initial_usd() -> Decimal {
    dec!(1000)
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            fee_percent: default_fee_percent(),
            initial_usd: default_initial_usd(),
        }
    }
}

/// Telemetry configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_deserialize() {
        let toml = r#"
            [cache]
            dir = "/tmp/candles"

            [gateway]
            base_url = "https://api.exchange.coinbase.com"
            min_delay_ms = 1500
            timeout_secs = 5

            [backtest]
            fee_percent = 0.002
            initial_usd = 500.0

            [telemetry]
            log_level = "debug"
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.cache.dir, PathBuf::from("/tmp/candles"));
        assert_eq!(config.gateway.min_delay_ms, 1500);
        assert_eq!(config.backtest.fee_percent, dec!(0.002));
        assert_eq!(config.telemetry.log_level, "debug");
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.cache.dir, PathBuf::from("./candle-cache"));
        assert_eq!(config.gateway.min_delay_ms, 1000);
        assert_eq!(config.backtest.fee_percent, dec!(0.006));
        assert_eq!(config.backtest.initial_usd, dec!(1000));
        assert_eq!(config.telemetry.log_level, "info");
    }

    #[test]
    fn test_gateway_to_runtime() {
        let config = GatewayConfig {
            base_url: "http://localhost:1".to_string(),
            min_delay_ms: 250,
            timeout_secs: 3,
        };
        let runtime = config.to_runtime();
        assert_eq!(runtime.base_url, "http://localhost:1");
        assert_eq!(runtime.min_delay, std::time::Duration::from_millis(250));
        assert_eq!(runtime.timeout, std::time::Duration::from_secs(3));
    }

    #[test]
    fn test_config_load_nonexistent() {
        let result = Config::load("/nonexistent/path/config.toml");
        assert!(result.is_err());
    }
}
