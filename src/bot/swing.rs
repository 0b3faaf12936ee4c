//! Reference swing strategy
//!
//! Buys when price dips a configured fraction below the high of a bounded
//! recent-candle window, sells once price rises a configured fraction above
//! the entry price. Deliberately simple; it exists to exercise the contract
//! and as a template for real strategies.

use super::{BotConfig, BuyFill, SellFill, TradeBot, TradeIntent};
use crate::candle::{Candle, Exchange, Granularity};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::VecDeque;

/// Tuning knobs for [`SwingBot`]
#[derive(Debug, Clone)]
pub struct SwingConfig {
    /// Coin the strategy trades
    pub coin: String,
    /// Exchange the strategy is written against
    pub exchange: Exchange,
    /// Candle granularity to request
    pub granularity: Granularity,
    /// Fraction below the window high that triggers a buy (0.03 = 3% dip)
    pub dip_fraction: Decimal,
    /// Fraction above the entry price that triggers a sell (0.05 = 5% rise)
    pub rise_fraction: Decimal,
    /// How many recent closes to remember
    pub window_len: usize,
}

impl Default for SwingConfig {
    fn default() -> Self {
        Self {
            coin: "BTC".to_string(),
            exchange: Exchange::CoinbasePro,
            granularity: Granularity::OneHour,
            dip_fraction: dec!(0.03),
            rise_fraction: dec!(0.05),
            window_len: 24,
        }
    }
}

/// Buy-the-dip / sell-the-rip swing strategy with a bounded candle window
pub struct SwingBot {
    config: SwingConfig,
    /// Recent closes, oldest first. Bounded to `window_len`; history capping
    /// is the bot's own concern, not the runner's.
    closes: VecDeque<Decimal>,
    /// Effective per-coin entry price of the open position, fee included.
    /// Remembered from the `bought` notification.
    entry_price: Option<Decimal>,
}

impl SwingBot {
    pub fn new(config: SwingConfig) -> Self {
        Self {
            config,
            closes: VecDeque::new(),
            entry_price: None,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(SwingConfig::default())
    }

    fn window_high(&self) -> Option<Decimal> {
        self.closes.iter().copied().max()
    }
}

impl TradeBot for SwingBot {
    fn config(&self) -> BotConfig {
        BotConfig {
            exchange: self.config.exchange,
            coin: self.config.coin.clone(),
            granularity: Some(self.config.granularity),
            wants_live_price_updates: false,
        }
    }

    fn apply_next_candle(&mut self, _time: DateTime<Utc>, candle: &Candle) {
        self.closes.push_back(candle.close);
        while self.closes.len() > self.config.window_len {
            self.closes.pop_front();
        }
    }

    fn wants_to_buy(
        &mut self,
        held_usd: Decimal,
        _held_coins: Decimal,
        per_coin_price: Decimal,
        _fee_percent: Decimal,
    ) -> Option<TradeIntent> {
        if self.entry_price.is_some() {
            return None;
        }
        let high = self.window_high()?;
        let trigger = high * (Decimal::ONE - self.config.dip_fraction);
        if per_coin_price <= trigger {
            return Some(TradeIntent::new(
                held_usd,
                format!("dip buy: {} at or below {}", per_coin_price, trigger),
            ));
        }
        None
    }

    fn wants_to_sell(
        &mut self,
        _held_usd: Decimal,
        held_coins: Decimal,
        per_coin_price: Decimal,
        _fee_percent: Decimal,
    ) -> Option<TradeIntent> {
        let entry = self.entry_price?;
        let target = entry * (Decimal::ONE + self.config.rise_fraction);
        if per_coin_price >= target {
            return Some(TradeIntent::new(
                held_coins,
                format!("swing sell: {} reached target {}", per_coin_price, target),
            ));
        }
        None
    }

    fn bought(&mut self, fill: &BuyFill) {
        self.entry_price = Some(fill.per_coin_price_with_fee);
    }

    fn sold(&mut self, _fill: &SellFill) {
        self.entry_price = None;
    }
}
