//! Trade fee arithmetic
//!
//! Pure conversion of gross trade amounts to net proceeds/cost. The fee is a
//! flat percentage of the gross amount on both sides.

use rust_decimal::Decimal;

/// Flat-percentage fee model applied to every simulated fill
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeModel {
    fee_percent: Decimal,
}

impl FeeModel {
    /// Create a fee model; `fee_percent` is a fraction, e.g. 0.002 for 0.2%
    pub fn new(fee_percent: Decimal) -> Self {
        Self { fee_percent }
    }

    /// Fee fraction
    pub fn fee_percent(&self) -> Decimal {
        self.fee_percent
    }

    /// Fee charged on a gross USD amount
    pub fn fee(&self, gross: Decimal) -> Decimal {
        self.fee_percent * gross
    }

    /// Coins purchased when spending `usd` at `price` per coin, after fees.
    /// `price` must be positive; callers guard the zero-price case.
    pub fn coins_bought(&self, usd: Decimal, price: Decimal) -> Decimal {
        (usd - self.fee(usd)) / price
    }

    /// USD gained when selling `coins` at `price` per coin, after fees
    pub fn usd_gained(&self, coins: Decimal, price: Decimal) -> Decimal {
        let gross = coins * price;
        gross - self.fee(gross)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_fee_on_gross() {
        let model = FeeModel::new(dec!(0.002));
        assert_eq!(model.fee(dec!(100)), dec!(0.2));
    }

    #[test]
    fn test_buy_conversion() {
        // fee = 0.2, coins = 99.8 / 50 = 1.996
        let model = FeeModel::new(dec!(0.002));
        assert_eq!(model.coins_bought(dec!(100), dec!(50)), dec!(1.996));
    }

    #[test]
    fn test_sell_conversion() {
        // gross = 1.996 * 50 = 99.8, fee = 0.1996, net = 99.6004
        let model = FeeModel::new(dec!(0.002));
        assert_eq!(model.usd_gained(dec!(1.996), dec!(50)), dec!(99.6004));
    }

    #[test]
    fn test_zero_fee() {
        let model = FeeModel::new(dec!(0));
        assert_eq!(model.fee(dec!(500)), dec!(0));
        assert_eq!(model.coins_bought(dec!(100), dec!(50)), dec!(2));
        assert_eq!(model.usd_gained(dec!(2), dec!(50)), dec!(100));
    }
}
