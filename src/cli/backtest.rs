//! Backtest command implementation

use crate::bot::{SwingBot, SwingConfig};
use crate::cache::CandleCache;
use crate::cancel::CancelToken;
use crate::candle::{Exchange, Granularity};
use crate::config::Config;
use crate::gateway::RateLimitedHttpGateway;
use crate::runner::{run_backtest, BacktestParams};
use chrono::{DateTime, Utc};
use clap::Args;
use rust_decimal::Decimal;
use std::sync::Arc;

#[derive(Args, Debug)]
pub struct BacktestArgs {
    /// Coin to trade (e.g. BTC)
    #[arg(long, default_value = "BTC")]
    pub coin: String,

    /// Simulation start (ISO 8601)
    #[arg(long)]
    pub start: String,

    /// Simulation end (ISO 8601)
    #[arg(long)]
    pub end: String,

    /// Candle granularity in seconds (60, 300, 900, 3600, 21600, 86400)
    #[arg(long, default_value = "3600")]
    pub granularity: i64,

    /// Seed capital in USD (defaults to the configured value)
    #[arg(long)]
    pub initial: Option<Decimal>,

    /// Dip fraction that triggers a buy
    #[arg(long, default_value = "0.03")]
    pub dip: Decimal,

    /// Rise fraction over entry that triggers a sell
    #[arg(long, default_value = "0.05")]
    pub rise: Decimal,

    /// Output format: json or table
    #[arg(long, default_value = "table")]
    pub format: String,
}

impl BacktestArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let granularity = Granularity::from_seconds(self.granularity)
            .ok_or_else(|| anyhow::anyhow!("unsupported granularity: {}", self.granularity))?;
        let start = parse_time(&self.start)?;
        let end = parse_time(&self.end)?;
        let initial_usd = self.initial.unwrap_or(config.backtest.initial_usd);

        let gateway = Arc::new(RateLimitedHttpGateway::with_config(
            config.gateway.to_runtime(),
        ));
        let cache = Arc::new(CandleCache::new(config.cache.dir.clone(), gateway));

        let mut bot = SwingBot::new(SwingConfig {
            coin: self.coin.clone(),
            exchange: Exchange::CoinbasePro,
            granularity,
            dip_fraction: self.dip,
            rise_fraction: self.rise,
            ..SwingConfig::default()
        });

        let cancel = CancelToken::new();
        let ctrl_c_token = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Ctrl-C received, cancelling run");
                ctrl_c_token.cancel();
            }
        });

        let params = BacktestParams {
            coin: self.coin.clone(),
            initial_usd,
            start,
            end,
            granularity,
        };

        let result = run_backtest(
            &mut bot,
            cache,
            config.backtest.fee_percent,
            &params,
            &cancel,
        )
        .await?;

        if self.format == "json" {
            println!("{}", serde_json::to_string_pretty(&result)?);
        } else {
            println!("{}", result.format_table(initial_usd));
        }

        Ok(())
    }
}

fn parse_time(value: &str) -> anyhow::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| anyhow::anyhow!("invalid time {:?}: {}", value, e))
}
