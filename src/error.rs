//! Engine error taxonomy
//!
//! Every variant aborts the in-progress run. `Cancelled` is the one
//! expected-shutdown path and is never logged as an error.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors produced by the candle cache and backtest runner
#[derive(Debug, Error)]
pub enum EngineError {
    /// Invalid candle range construction (count exceeds the exchange cap, etc.)
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// End time before start time
    #[error("invalid range: end {end} is before start {start}")]
    InvalidRange {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    /// Requested span exceeds the supported maximum
    #[error("range of {days} days exceeds the {max_days}-day maximum")]
    RangeTooLarge { days: i64, max_days: i64 },

    /// Upstream exchange call failed, returned out-of-window data, or the
    /// response could not be parsed. Never retried automatically.
    #[error("candle fetch failed: {0}")]
    Fetch(#[source] anyhow::Error),

    /// A strategy requested a trade exceeding its held balance. Treated as a
    /// defect in the strategy, fatal to the run.
    #[error("invalid bot operation: {0}")]
    InvalidBotOperation(String),

    /// Cooperative shutdown; simply unwinds.
    #[error("run cancelled")]
    Cancelled,
}

impl EngineError {
    /// Wrap an upstream failure as a fetch error
    pub fn fetch(err: impl Into<anyhow::Error>) -> Self {
        Self::Fetch(err.into())
    }
}
