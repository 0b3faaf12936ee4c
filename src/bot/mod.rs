//! Trading strategy ("bot") contract
//!
//! Strategies are swappable implementations of [`TradeBot`]. A bot reports
//! its configuration once, reacts to candle/price events, and answers
//! buy/sell queries with intents. The runner owns the account; a bot never
//! mutates balances and its decisions are requests, not executions.

mod swing;

pub use swing::{SwingBot, SwingConfig};

use crate::candle::{Candle, Exchange, Granularity};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Configuration a bot reports once per run, before any events
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Exchange the strategy is written against
    pub exchange: Exchange,
    /// Coin the strategy trades
    pub coin: String,
    /// Candle granularity the strategy wants, or `None` to decline candles
    pub granularity: Option<Granularity>,
    /// Whether the strategy wants per-tick price updates
    pub wants_live_price_updates: bool,
}

/// A requested trade: how much to act with and a note for the trace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradeIntent {
    /// USD to spend (buy) or coins to sell (sell)
    pub amount: Decimal,
    /// Free-form note recorded in the account trace
    pub note: String,
}

impl TradeIntent {
    pub fn new(amount: Decimal, note: impl Into<String>) -> Self {
        Self {
            amount,
            note: note.into(),
        }
    }
}

/// Details of an executed buy, delivered to the bot after the fact
#[derive(Debug, Clone)]
pub struct BuyFill {
    pub spent_usd: Decimal,
    pub bought_coins: Decimal,
    pub new_usd: Decimal,
    pub new_coins: Decimal,
    pub fee_usd: Decimal,
    /// Effective per-coin price once the fee is accounted for
    pub per_coin_price_with_fee: Decimal,
    /// Market per-coin price the fill executed against
    pub per_coin_price: Decimal,
}

/// Details of an executed sell, delivered to the bot after the fact
#[derive(Debug, Clone)]
pub struct SellFill {
    pub sold_coins: Decimal,
    pub gained_usd: Decimal,
    pub new_usd: Decimal,
    pub new_coins: Decimal,
    pub fee_usd: Decimal,
    pub per_coin_price_with_fee: Decimal,
    pub per_coin_price: Decimal,
}

/// The strategy contract the runner drives.
///
/// Call order within a run: `config` exactly once, then per closed candle
/// (strictly time-ordered) `apply_next_candle`, optionally
/// `apply_current_price`, then the buy/sell queries. `bought`/`sold` follow
/// each executed trade so the bot can track its own signals (entry price and
/// the like); the runner remains the authority on balances.
pub trait TradeBot: Send {
    /// Report the run configuration. Called exactly once, first.
    fn config(&self) -> BotConfig;

    /// Observe one closed candle
    fn apply_next_candle(&mut self, time: DateTime<Utc>, candle: &Candle);

    /// Observe the current price. Only delivered when
    /// [`BotConfig::wants_live_price_updates`] is set.
    fn apply_current_price(&mut self, _time: DateTime<Utc>, _price: Decimal) {}

    /// Decide whether to spend USD at the given per-coin price. Pure
    /// decision: returning an intent is a request, not an execution.
    fn wants_to_buy(
        &mut self,
        held_usd: Decimal,
        held_coins: Decimal,
        per_coin_price: Decimal,
        fee_percent: Decimal,
    ) -> Option<TradeIntent>;

    /// Decide whether to sell coins at the given per-coin price
    fn wants_to_sell(
        &mut self,
        held_usd: Decimal,
        held_coins: Decimal,
        per_coin_price: Decimal,
        fee_percent: Decimal,
    ) -> Option<TradeIntent>;

    /// Notification that a requested buy executed
    fn bought(&mut self, _fill: &BuyFill) {}

    /// Notification that a requested sell executed
    fn sold(&mut self, _fill: &SellFill) {}
}
