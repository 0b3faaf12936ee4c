//! Candle market data types
//!
//! OHLC candles, bucket granularities, the exchanges that serve them, and the
//! range addressing used by the disk cache.

mod range;
mod range_id;

pub use range::CandleRange;
pub use range_id::{CandleRangeId, CACHE_FILE_SUFFIX};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// OHLC price summary for one fixed time bucket. Immutable once constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candle {
    /// Opening price
    pub open: Decimal,
    /// Closing price
    pub close: Decimal,
    /// Highest trade price in the bucket
    pub high: Decimal,
    /// Lowest trade price in the bucket
    pub low: Decimal,
}

impl Candle {
    /// Create a candle from its four prices
    pub fn new(open: Decimal, close: Decimal, high: Decimal, low: Decimal) -> Self {
        Self {
            open,
            close,
            high,
            low,
        }
    }

    /// Close below open
    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }

    /// Close above open
    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }
}

/// Candle bucket duration. Only the granularities the exchange serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Granularity {
    OneMinute,
    FiveMinutes,
    FifteenMinutes,
    OneHour,
    SixHours,
    OneDay,
}

impl Granularity {
    /// Bucket duration in seconds
    pub fn seconds(&self) -> i64 {
        match self {
            Granularity::OneMinute => 60,
            Granularity::FiveMinutes => 300,
            Granularity::FifteenMinutes => 900,
            Granularity::OneHour => 3600,
            Granularity::SixHours => 21600,
            Granularity::OneDay => 86400,
        }
    }

    /// Parse from a bucket duration in seconds
    pub fn from_seconds(seconds: i64) -> Option<Self> {
        match seconds {
            60 => Some(Granularity::OneMinute),
            300 => Some(Granularity::FiveMinutes),
            900 => Some(Granularity::FifteenMinutes),
            3600 => Some(Granularity::OneHour),
            21600 => Some(Granularity::SixHours),
            86400 => Some(Granularity::OneDay),
            _ => None,
        }
    }

    /// Bucket duration as a chrono duration
    pub fn duration(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.seconds())
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.seconds())
    }
}

/// Exchanges the engine can address candles against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Exchange {
    Coinbase,
    CoinbasePro,
    Kucoin,
    None,
}

impl Exchange {
    /// Maximum candle count a single request to this exchange may carry
    pub fn max_candle_count(&self) -> usize {
        match self {
            Exchange::Kucoin => 1500,
            Exchange::Coinbase | Exchange::CoinbasePro | Exchange::None => 300,
        }
    }
}

impl fmt::Display for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Exchange::Coinbase => "Coinbase",
            Exchange::CoinbasePro => "CoinbasePro",
            Exchange::Kucoin => "Kucoin",
            Exchange::None => "None",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for Exchange {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Coinbase" => Ok(Exchange::Coinbase),
            "CoinbasePro" => Ok(Exchange::CoinbasePro),
            "Kucoin" => Ok(Exchange::Kucoin),
            "None" => Ok(Exchange::None),
            _ => Err(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_candle_bearish() {
        let candle = Candle::new(dec!(100), dec!(95), dec!(101), dec!(94));
        assert!(candle.is_bearish());
        assert!(!candle.is_bullish());
    }

    #[test]
    fn test_candle_bullish() {
        let candle = Candle::new(dec!(100), dec!(105), dec!(106), dec!(99));
        assert!(candle.is_bullish());
        assert!(!candle.is_bearish());
    }

    #[test]
    fn test_candle_flat_is_neither() {
        let candle = Candle::new(dec!(100), dec!(100), dec!(100), dec!(100));
        assert!(!candle.is_bullish());
        assert!(!candle.is_bearish());
    }

    #[test]
    fn test_granularity_seconds_round_trip() {
        for granularity in [
            Granularity::OneMinute,
            Granularity::FiveMinutes,
            Granularity::FifteenMinutes,
            Granularity::OneHour,
            Granularity::SixHours,
            Granularity::OneDay,
        ] {
            assert_eq!(
                Granularity::from_seconds(granularity.seconds()),
                Some(granularity)
            );
        }
    }

    #[test]
    fn test_granularity_rejects_unknown() {
        assert_eq!(Granularity::from_seconds(120), None);
        assert_eq!(Granularity::from_seconds(0), None);
        assert_eq!(Granularity::from_seconds(-60), None);
    }

    #[test]
    fn test_exchange_max_candle_count() {
        assert_eq!(Exchange::Coinbase.max_candle_count(), 300);
        assert_eq!(Exchange::CoinbasePro.max_candle_count(), 300);
        assert_eq!(Exchange::Kucoin.max_candle_count(), 1500);
        assert_eq!(Exchange::None.max_candle_count(), 300);
    }

    #[test]
    fn test_exchange_name_round_trip() {
        for exchange in [
            Exchange::Coinbase,
            Exchange::CoinbasePro,
            Exchange::Kucoin,
            Exchange::None,
        ] {
            assert_eq!(exchange.to_string().parse::<Exchange>(), Ok(exchange));
        }
    }

    #[test]
    fn test_exchange_parse_rejects_unknown() {
        assert!("Binance".parse::<Exchange>().is_err());
        assert!("coinbase".parse::<Exchange>().is_err());
    }
}
