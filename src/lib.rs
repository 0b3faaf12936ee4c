//! coinbt: candle-caching market data layer and strategy backtesting engine
//!
//! This library provides the core components for:
//! - Candle range addressing with a filesystem-safe codec
//! - A durable, gap-aware on-disk candle cache
//! - Rate-limited exchange access through a single serialized gateway
//! - A pluggable trading-strategy (bot) contract
//! - A backtest runner enforcing solvency and balance invariants
//! - Structured logging and TOML configuration

pub mod bot;
pub mod cache;
pub mod cancel;
pub mod candle;
pub mod cli;
pub mod config;
pub mod error;
pub mod fees;
pub mod gateway;
pub mod runner;
pub mod telemetry;
