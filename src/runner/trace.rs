//! Backtest output: account snapshots and the run result

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;

/// Snapshot of the simulated account, appended once per executed trade
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BotState {
    /// Simulated time of the trade
    pub time: DateTime<Utc>,
    /// USD held after the trade
    pub usd: Decimal,
    /// Coins held after the trade
    pub coin_count: Decimal,
    /// The bot's note for this trade
    pub note: String,
}

/// Final output of a backtest run
#[derive(Debug, Clone, Serialize)]
pub struct BacktestResult {
    /// Ordered account snapshots, one per executed trade plus a possible
    /// forced liquidation at the end
    pub trace: Vec<BotState>,
    /// USD held after final liquidation
    pub final_usd: Decimal,
    /// Coins held at the end (zero unless liquidation was impossible)
    pub final_coin_count: Decimal,
    /// Whether the account ended below the solvency floor
    pub is_sunk: bool,
}

impl BacktestResult {
    /// Simple return on the starting capital, as a fraction
    pub fn return_fraction(&self, initial_usd: Decimal) -> Decimal {
        if initial_usd.is_zero() {
            return Decimal::ZERO;
        }
        (self.final_usd - initial_usd) / initial_usd
    }

    /// Format as table for CLI output
    pub fn format_table(&self, initial_usd: Decimal) -> String {
        format!(
            r#"
══════════════════════════════════════════════════════
               BACKTEST RESULTS
══════════════════════════════════════════════════════

ACCOUNT
───────────────────────────────────────────────────────
Initial USD:      {:.2}
Final USD:        {:.2} ({:+.2}%)
Final Coins:      {}
Sunk:             {}

ACTIVITY
───────────────────────────────────────────────────────
Trades:           {}
══════════════════════════════════════════════════════
"#,
            initial_usd,
            self.final_usd,
            self.return_fraction(initial_usd) * dec!(100),
            self.final_coin_count,
            if self.is_sunk { "YES" } else { "no" },
            self.trace.len(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_return_fraction() {
        let result = BacktestResult {
            trace: vec![],
            final_usd: dec!(1100),
            final_coin_count: dec!(0),
            is_sunk: false,
        };
        assert_eq!(result.return_fraction(dec!(1000)), dec!(0.1));
        assert_eq!(result.return_fraction(dec!(0)), dec!(0));
    }

    #[test]
    fn test_format_table_mentions_outcome() {
        let result = BacktestResult {
            trace: vec![BotState {
                time: Utc::now(),
                usd: dec!(700),
                coin_count: dec!(0),
                note: "forced sell at end of simulation".to_string(),
            }],
            final_usd: dec!(700),
            final_coin_count: dec!(0),
            is_sunk: true,
        };

        let table = result.format_table(dec!(1000));
        assert!(table.contains("YES"));
        assert!(table.contains("Trades:           1"));
    }
}
