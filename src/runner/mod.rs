//! Backtest runner
//!
//! Drives simulated time forward candle-by-candle, pulls pages from the
//! candle cache, queries the bot for intent, executes trades against the fee
//! model, and records a trace of account state. The runner owns the account:
//! bots request trades, the runner checks them against held balances and a
//! request exceeding them is a strategy defect that fails the run.

mod trace;

pub use trace::{BacktestResult, BotState};

use crate::bot::{BuyFill, SellFill, TradeBot};
use crate::cache::CandleCache;
use crate::cancel::CancelToken;
use crate::candle::{CandleRangeId, Granularity};
use crate::error::EngineError;
use crate::fees::FeeModel;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;

/// Longest span a single run may cover
const MAX_SPAN_DAYS: i64 = 366;

/// An account whose total value falls below this fraction of its starting
/// capital is sunk
const SUNK_FRACTION: Decimal = dec!(0.80);

/// Inputs for one backtest run
#[derive(Debug, Clone)]
pub struct BacktestParams {
    /// Coin to trade
    pub coin: String,
    /// Seed capital in USD
    pub initial_usd: Decimal,
    /// Simulation start
    pub start: DateTime<Utc>,
    /// Simulation end (exclusive)
    pub end: DateTime<Utc>,
    /// Candle granularity the simulation steps by
    pub granularity: Granularity,
}

/// Runner-owned account state; bots never touch this directly
struct Account {
    held_usd: Decimal,
    held_coins: Decimal,
    sunk: bool,
}

/// Replays cached candle history through a [`TradeBot`]
pub struct BacktestRunner {
    cache: Arc<CandleCache>,
    fees: FeeModel,
}

impl BacktestRunner {
    pub fn new(cache: Arc<CandleCache>, fees: FeeModel) -> Self {
        Self { cache, fees }
    }

    /// Run a backtest to completion.
    ///
    /// Fails fast on invalid ranges, fetch failures, and bot requests that
    /// exceed held balances; cancellation unwinds cleanly. The trace inside a
    /// successful result is append-only and time-ordered.
    pub async fn run(
        &self,
        bot: &mut dyn TradeBot,
        params: &BacktestParams,
        cancel: &CancelToken,
    ) -> Result<BacktestResult, EngineError> {
        if params.end < params.start {
            return Err(EngineError::InvalidRange {
                start: params.start,
                end: params.end,
            });
        }
        let days = (params.end - params.start).num_days();
        if days > MAX_SPAN_DAYS {
            return Err(EngineError::RangeTooLarge {
                days,
                max_days: MAX_SPAN_DAYS,
            });
        }
        let fee_percent = self.fees.fee_percent();
        if fee_percent < Decimal::ZERO || fee_percent >= Decimal::ONE {
            return Err(EngineError::Configuration(format!(
                "fee fraction {} must be in [0, 1)",
                fee_percent
            )));
        }

        // Called exactly once, before any candle events
        let bot_config = bot.config();
        let exchange = bot_config.exchange;
        let granularity = params.granularity;
        let step = granularity.duration();
        let page_max = exchange.max_candle_count();

        tracing::info!(
            coin = %params.coin,
            exchange = %exchange,
            granularity = %granularity,
            start = %params.start,
            end = %params.end,
            initial_usd = %params.initial_usd,
            "Starting backtest"
        );

        let mut account = Account {
            held_usd: params.initial_usd,
            held_coins: Decimal::ZERO,
            sunk: false,
        };
        let sunk_floor = SUNK_FRACTION * params.initial_usd;
        let mut trace: Vec<BotState> = Vec::new();
        let mut last_price: Option<Decimal> = None;
        let mut current = params.start;

        while current < params.end && !account.sunk {
            if cancel.is_cancelled() {
                tracing::debug!("Backtest cancelled between pages");
                return Err(EngineError::Cancelled);
            }

            let id = self.page_id(params, exchange, current, page_max)?;
            let range = self.cache.fetch_range(&id, cancel).await?;

            for slot in range.candles() {
                current += step;
                if current >= params.end {
                    break;
                }
                if cancel.is_cancelled() {
                    return Err(EngineError::Cancelled);
                }
                // Gap: no candle, no decisions this tick
                let Some(candle) = slot else { continue };

                bot.apply_next_candle(current, candle);
                let price = candle.close;
                last_price = Some(price);
                if bot_config.wants_live_price_updates {
                    bot.apply_current_price(current, price);
                }

                if account.held_usd > Decimal::ZERO {
                    if let Some(intent) = bot.wants_to_buy(
                        account.held_usd,
                        account.held_coins,
                        price,
                        self.fees.fee_percent(),
                    ) {
                        self.execute_buy(bot, &mut account, &mut trace, current, price, intent)?;
                    }
                }

                if account.held_coins > Decimal::ZERO {
                    if let Some(intent) = bot.wants_to_sell(
                        account.held_usd,
                        account.held_coins,
                        price,
                        self.fees.fee_percent(),
                    ) {
                        self.execute_sell(bot, &mut account, &mut trace, current, price, intent)?;
                    }
                }

                let total_value = account.held_usd + account.held_coins * price;
                if total_value < sunk_floor {
                    if !account.sunk {
                        tracing::warn!(
                            time = %current,
                            total_value = %total_value,
                            floor = %sunk_floor,
                            "Account value fell below solvency floor"
                        );
                    }
                    account.sunk = true;
                }
            }
        }

        // Whatever is still held gets converted back to USD at the last
        // observed close so the result is comparable to the seed capital.
        if account.held_coins > Decimal::ZERO {
            if let Some(price) = last_price {
                self.force_liquidate(bot, &mut account, &mut trace, params.end, price);
            }
        }

        let is_sunk = account.held_usd < sunk_floor;
        tracing::info!(
            final_usd = %account.held_usd,
            trades = trace.len(),
            is_sunk,
            "Backtest complete"
        );

        Ok(BacktestResult {
            trace,
            final_usd: account.held_usd,
            final_coin_count: account.held_coins,
            is_sunk,
        })
    }

    /// Range id for the page starting at `current`, sized to the smaller of
    /// the exchange page cap and the buckets left before the end time
    fn page_id(
        &self,
        params: &BacktestParams,
        exchange: crate::candle::Exchange,
        current: DateTime<Utc>,
        page_max: usize,
    ) -> Result<CandleRangeId, EngineError> {
        let seconds_left = (params.end - current).num_seconds();
        let granularity_seconds = params.granularity.seconds();
        let remaining = (seconds_left + granularity_seconds - 1) / granularity_seconds;
        let count = (remaining.max(1) as usize).min(page_max);

        CandleRangeId::new(&params.coin, exchange, current, count, params.granularity)
    }

    fn execute_buy(
        &self,
        bot: &mut dyn TradeBot,
        account: &mut Account,
        trace: &mut Vec<BotState>,
        time: DateTime<Utc>,
        price: Decimal,
        intent: crate::bot::TradeIntent,
    ) -> Result<(), EngineError> {
        if intent.amount <= Decimal::ZERO || intent.amount > account.held_usd {
            return Err(EngineError::InvalidBotOperation(format!(
                "buy of {} USD requested while holding {} USD",
                intent.amount, account.held_usd
            )));
        }
        // A zero close is valid market data, but buying at it would grant
        // unbounded coins for finite USD.
        if price <= Decimal::ZERO {
            return Err(EngineError::InvalidBotOperation(format!(
                "buy of {} USD requested at non-positive price {}",
                intent.amount, price
            )));
        }

        let fee_usd = self.fees.fee(intent.amount);
        let bought_coins = self.fees.coins_bought(intent.amount, price);
        account.held_usd -= intent.amount;
        account.held_coins += bought_coins;

        tracing::info!(
            time = %time,
            spent = %intent.amount,
            coins = %bought_coins,
            price = %price,
            note = %intent.note,
            "Executed buy"
        );

        trace.push(BotState {
            time,
            usd: account.held_usd,
            coin_count: account.held_coins,
            note: intent.note,
        });

        bot.bought(&BuyFill {
            spent_usd: intent.amount,
            bought_coins,
            new_usd: account.held_usd,
            new_coins: account.held_coins,
            fee_usd,
            per_coin_price_with_fee: intent.amount / bought_coins,
            per_coin_price: price,
        });

        Ok(())
    }

    fn execute_sell(
        &self,
        bot: &mut dyn TradeBot,
        account: &mut Account,
        trace: &mut Vec<BotState>,
        time: DateTime<Utc>,
        price: Decimal,
        intent: crate::bot::TradeIntent,
    ) -> Result<(), EngineError> {
        if intent.amount <= Decimal::ZERO || intent.amount > account.held_coins {
            return Err(EngineError::InvalidBotOperation(format!(
                "sell of {} coins requested while holding {} coins",
                intent.amount, account.held_coins
            )));
        }

        let gross = intent.amount * price;
        let fee_usd = self.fees.fee(gross);
        let gained_usd = self.fees.usd_gained(intent.amount, price);
        account.held_coins -= intent.amount;
        account.held_usd += gained_usd;

        tracing::info!(
            time = %time,
            coins = %intent.amount,
            gained = %gained_usd,
            price = %price,
            note = %intent.note,
            "Executed sell"
        );

        trace.push(BotState {
            time,
            usd: account.held_usd,
            coin_count: account.held_coins,
            note: intent.note,
        });

        bot.sold(&SellFill {
            sold_coins: intent.amount,
            gained_usd,
            new_usd: account.held_usd,
            new_coins: account.held_coins,
            fee_usd,
            per_coin_price_with_fee: gained_usd / intent.amount,
            per_coin_price: price,
        });

        Ok(())
    }

    fn force_liquidate(
        &self,
        bot: &mut dyn TradeBot,
        account: &mut Account,
        trace: &mut Vec<BotState>,
        time: DateTime<Utc>,
        price: Decimal,
    ) {
        let sold_coins = account.held_coins;
        let gross = sold_coins * price;
        let fee_usd = self.fees.fee(gross);
        let gained_usd = self.fees.usd_gained(sold_coins, price);
        account.held_coins = Decimal::ZERO;
        account.held_usd += gained_usd;

        tracing::info!(
            coins = %sold_coins,
            gained = %gained_usd,
            price = %price,
            "Forced liquidation at end of simulation"
        );

        trace.push(BotState {
            time,
            usd: account.held_usd,
            coin_count: account.held_coins,
            note: "forced sell at end of simulation".to_string(),
        });

        bot.sold(&SellFill {
            sold_coins,
            gained_usd,
            new_usd: account.held_usd,
            new_coins: account.held_coins,
            fee_usd,
            per_coin_price_with_fee: gained_usd / sold_coins,
            per_coin_price: price,
        });
    }
}

/// One-call backtest surface: build a run from a bot and parameters against
/// an existing cache.
pub async fn run_backtest(
    bot: &mut dyn TradeBot,
    cache: Arc<CandleCache>,
    fee_percent: Decimal,
    params: &BacktestParams,
    cancel: &CancelToken,
) -> Result<BacktestResult, EngineError> {
    BacktestRunner::new(cache, FeeModel::new(fee_percent))
        .run(bot, params, cancel)
        .await
}
