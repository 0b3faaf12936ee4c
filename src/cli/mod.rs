//! CLI interface for coinbt
//!
//! Provides subcommands for:
//! - `backtest`: Replay cached candle history through the swing strategy
//! - `fetch`: Pre-warm the candle cache for a time range
//! - `config`: Show effective configuration

mod backtest;
mod fetch;

pub use backtest::BacktestArgs;
pub use fetch::FetchArgs;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "coinbt")]
#[command(about = "Candle-caching market data layer and strategy backtesting engine")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a backtest of the swing strategy
    Backtest(BacktestArgs),
    /// Pre-warm the candle cache for a time range
    Fetch(FetchArgs),
    /// Show effective configuration
    Config,
}
