//! Candle range addressing and filename codec
//!
//! A `CandleRangeId` names a contiguous block of candles. Its encoded form is
//! the cache filename, so encoding must be filesystem-safe and decoding must
//! tolerate any foreign file that happens to live in the cache directory.

use super::{Exchange, Granularity};
use crate::error::EngineError;
use chrono::{DateTime, TimeZone, Utc};

/// Fixed suffix appended to every encoded range token
pub const CACHE_FILE_SUFFIX: &str = ".candles.json";

/// Timestamp layout inside the token, colons swapped for underscores so the
/// token stays a valid filename on every platform.
const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Value key identifying a contiguous block of candles
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CandleRangeId {
    coin: String,
    exchange: Exchange,
    start: DateTime<Utc>,
    count: usize,
    granularity: Granularity,
}

impl CandleRangeId {
    /// Create a range id. The start time is truncated to whole seconds;
    /// sub-second precision is never meaningful for the cache.
    ///
    /// The coin must be a plain alphanumeric ticker: the encoded id is both a
    /// space-joined token and a cache filename, so whitespace or path
    /// separators in the coin would break the codec or escape the cache
    /// directory.
    pub fn new(
        coin: impl Into<String>,
        exchange: Exchange,
        start: DateTime<Utc>,
        count: usize,
        granularity: Granularity,
    ) -> Result<Self, EngineError> {
        let coin = coin.into();
        if coin.is_empty() || !coin.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(EngineError::Configuration(format!(
                "coin {:?} must be a non-empty alphanumeric ticker",
                coin
            )));
        }
        if count == 0 {
            return Err(EngineError::Configuration(
                "candle count must be positive".to_string(),
            ));
        }
        let max = exchange.max_candle_count();
        if count > max {
            return Err(EngineError::Configuration(format!(
                "candle count {} exceeds {} maximum of {}",
                count, exchange, max
            )));
        }

        let start = Utc
            .timestamp_opt(start.timestamp(), 0)
            .single()
            .ok_or_else(|| EngineError::Configuration("start time out of range".to_string()))?;

        Ok(Self {
            coin,
            exchange,
            start,
            count,
            granularity,
        })
    }

    pub fn coin(&self) -> &str {
        &self.coin
    }

    pub fn exchange(&self) -> Exchange {
        self.exchange
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    /// Total wall-clock span covered by the range
    pub fn time_length(&self) -> chrono::Duration {
        self.granularity.duration() * self.count as i32
    }

    /// First instant past the range
    pub fn end_time(&self) -> DateTime<Utc> {
        self.start + self.time_length()
    }

    /// Encode to the cache filename token. Deterministic and reversible:
    /// five space-joined fields plus a fixed suffix.
    pub fn encode(&self) -> String {
        let time = self.start.format(TIME_FORMAT).to_string().replace(':', "_");
        format!(
            "{} {} {} {} {}{}",
            self.coin, self.exchange, time, self.count, self.granularity, CACHE_FILE_SUFFIX
        )
    }

    /// Decode a cache filename token. Any malformed or foreign filename
    /// yields `None`; this is used to scan a cache directory safely and must
    /// never panic.
    pub fn decode(token: &str) -> Option<Self> {
        let body = token.strip_suffix(CACHE_FILE_SUFFIX)?;
        let fields: Vec<&str> = body.split(' ').collect();
        if fields.len() != 5 {
            return None;
        }

        let coin = fields[0];
        if coin.is_empty() {
            return None;
        }
        let exchange: Exchange = fields[1].parse().ok()?;
        let time = fields[2].replace('_', ":");
        let start = chrono::NaiveDateTime::parse_from_str(&time, TIME_FORMAT)
            .ok()?
            .and_utc();
        let count: usize = fields[3].parse().ok()?;
        let granularity = Granularity::from_seconds(fields[4].parse().ok()?)?;

        Self::new(coin, exchange, start, count, granularity).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_id() -> CandleRangeId {
        CandleRangeId::new(
            "BTC",
            Exchange::CoinbasePro,
            Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap(),
            300,
            Granularity::OneMinute,
        )
        .unwrap()
    }

    #[test]
    fn test_encode_layout() {
        let token = sample_id().encode();
        assert_eq!(
            token,
            "BTC CoinbasePro 2024-01-15T10_30_00Z 300 60.candles.json"
        );
        // Filesystem-safe: no colons survive encoding
        assert!(!token.contains(':'));
    }

    #[test]
    fn test_round_trip() {
        let id = sample_id();
        assert_eq!(CandleRangeId::decode(&id.encode()), Some(id));
    }

    #[test]
    fn test_round_trip_all_exchanges_and_granularities() {
        for exchange in [
            Exchange::Coinbase,
            Exchange::CoinbasePro,
            Exchange::Kucoin,
            Exchange::None,
        ] {
            for granularity in [
                Granularity::OneMinute,
                Granularity::FiveMinutes,
                Granularity::FifteenMinutes,
                Granularity::OneHour,
                Granularity::SixHours,
                Granularity::OneDay,
            ] {
                let id = CandleRangeId::new(
                    "ETH",
                    exchange,
                    Utc.with_ymd_and_hms(2023, 6, 1, 0, 0, 0).unwrap(),
                    100,
                    granularity,
                )
                .unwrap();
                assert_eq!(CandleRangeId::decode(&id.encode()), Some(id));
            }
        }
    }

    #[test]
    fn test_start_truncated_to_whole_seconds() {
        let start = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap()
            + chrono::Duration::milliseconds(750);
        let id =
            CandleRangeId::new("BTC", Exchange::CoinbasePro, start, 10, Granularity::OneMinute)
                .unwrap();
        assert_eq!(
            id.start(),
            Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap()
        );
    }

    #[test]
    fn test_count_above_exchange_max_is_configuration_error() {
        let result = CandleRangeId::new(
            "BTC",
            Exchange::CoinbasePro,
            Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap(),
            301,
            Granularity::OneMinute,
        );
        assert!(matches!(result, Err(EngineError::Configuration(_))));

        // Kucoin allows larger pages
        let result = CandleRangeId::new(
            "BTC",
            Exchange::Kucoin,
            Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap(),
            1500,
            Granularity::OneMinute,
        );
        assert!(result.is_ok());
    }

    #[test]
    fn test_zero_count_is_configuration_error() {
        let result = CandleRangeId::new(
            "BTC",
            Exchange::CoinbasePro,
            Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap(),
            0,
            Granularity::OneMinute,
        );
        assert!(matches!(result, Err(EngineError::Configuration(_))));
    }

    #[test]
    fn test_coin_must_be_alphanumeric() {
        for coin in ["", "B TC", "BTC/USD", "../escape", "..\\escape", "BTC\t"] {
            let result = CandleRangeId::new(
                coin,
                Exchange::CoinbasePro,
                Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap(),
                10,
                Granularity::OneMinute,
            );
            assert!(
                matches!(result, Err(EngineError::Configuration(_))),
                "coin: {:?}",
                coin
            );
        }
    }

    #[test]
    fn test_encoded_token_is_a_single_path_component() {
        // Every constructible id must encode to a plain filename.
        let token = sample_id().encode();
        assert!(!token.contains('/'));
        assert!(!token.contains('\\'));
    }

    #[test]
    fn test_time_length_and_end_time() {
        let id = sample_id();
        assert_eq!(id.time_length(), chrono::Duration::minutes(300));
        assert_eq!(id.end_time(), id.start() + chrono::Duration::minutes(300));
    }

    #[test]
    fn test_decode_rejects_malformed_tokens() {
        for token in [
            "",
            "garbage",
            "BTC CoinbasePro 2024-01-15T10_30_00Z 300 60",          // missing suffix
            "BTC CoinbasePro 2024-01-15T10_30_00Z 300.candles.json", // four fields
            "BTC Binance 2024-01-15T10_30_00Z 300 60.candles.json",  // unknown exchange
            "BTC CoinbasePro not-a-time 300 60.candles.json",
            "BTC CoinbasePro 2024-01-15T10_30_00Z many 60.candles.json",
            "BTC CoinbasePro 2024-01-15T10_30_00Z 300 61.candles.json", // bad granularity
            "BTC CoinbasePro 2024-01-15T10_30_00Z 0 60.candles.json",   // zero count
            "BTC CoinbasePro 2024-01-15T10_30_00Z 9999 60.candles.json", // over cap
            " CoinbasePro 2024-01-15T10_30_00Z 300 60.candles.json",    // empty coin
            ".DS_Store",
            "portfolio.json",
        ] {
            assert_eq!(CandleRangeId::decode(token), None, "token: {:?}", token);
        }
    }
}
