//! Cache pre-warm command implementation

use crate::cache::CandleCache;
use crate::cancel::CancelToken;
use crate::candle::{CandleRangeId, Exchange, Granularity};
use crate::config::Config;
use crate::gateway::RateLimitedHttpGateway;
use chrono::{DateTime, Utc};
use clap::Args;
use std::sync::Arc;

#[derive(Args, Debug)]
pub struct FetchArgs {
    /// Coin to fetch (e.g. BTC)
    #[arg(long, default_value = "BTC")]
    pub coin: String,

    /// Range start (ISO 8601)
    #[arg(long)]
    pub start: String,

    /// Range end (ISO 8601)
    #[arg(long)]
    pub end: String,

    /// Candle granularity in seconds
    #[arg(long, default_value = "3600")]
    pub granularity: i64,
}

impl FetchArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let granularity = Granularity::from_seconds(self.granularity)
            .ok_or_else(|| anyhow::anyhow!("unsupported granularity: {}", self.granularity))?;
        let start = DateTime::parse_from_rfc3339(&self.start)?.with_timezone(&Utc);
        let end = DateTime::parse_from_rfc3339(&self.end)?.with_timezone(&Utc);
        let exchange = Exchange::CoinbasePro;

        let gateway = Arc::new(RateLimitedHttpGateway::with_config(
            config.gateway.to_runtime(),
        ));
        let cache = Arc::new(CandleCache::new(config.cache.dir.clone(), gateway));
        let cancel = CancelToken::new();

        let step = granularity.duration();
        let page_max = exchange.max_candle_count();
        let mut current = start;
        let mut fetched = 0usize;

        while current < end {
            let seconds_left = (end - current).num_seconds();
            let remaining =
                (seconds_left + granularity.seconds() - 1) / granularity.seconds();
            let count = (remaining.max(1) as usize).min(page_max);

            let id = CandleRangeId::new(&self.coin, exchange, current, count, granularity)?;
            let range = cache.fetch_range(&id, &cancel).await?;
            fetched += range.present_count();
            current += step * count as i32;
        }

        let cached = cache.cached_range_ids().await.len();
        println!(
            "Fetched {} candles for {}; cache now holds {} range files",
            fetched, self.coin, cached
        );

        Ok(())
    }
}
