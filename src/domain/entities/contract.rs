use crate::domain::values::right::Right;
use crate::domain::values::strike::Strike;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Contract {
    pub root: String,
    pub expiration: NaiveDate,
    pub right: Right,
    pub strike: Strike,
}

impl Contract {
    pub fn new(root: impl Into<String>, expiration: NaiveDate, right: Right, strike: Strike) -> Self {
        Self {
            root: root.into().trim().to_uppercase(),
            expiration,
            right,
            strike,
        }
    }

    /// Symbol used as the cache key, e.g. `SPY_011924C475.5`.
    pub fn symbol(&self) -> String {
        format!(
            "{}_{}{}{}",
            self.root,
            self.expiration.format("%m%d%y"),
            self.right,
            self.strike
        )
    }

    pub fn with_strike(&self, strike: Strike) -> Self {
        Self {
            strike,
            ..self.clone()
        }
    }
}

impl fmt::Display for Contract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_format() {
        let exp = NaiveDate::from_ymd_opt(2024, 1, 19).unwrap();
        let c = Contract::new("spy", exp, Right::Call, Strike::from_price(475.5));
        assert_eq!(c.symbol(), "SPY_011924C475.5");

        let p = c.with_strike(Strike::from_price(470.0));
        assert_eq!(p.symbol(), "SPY_011924C470");
    }

    #[test]
    fn test_fractional_strike_keeps_significant_zero() {
        let exp = NaiveDate::from_ymd_opt(2024, 4, 5).unwrap();
        let c = Contract::new("ACB", exp, Right::Put, Strike::from_thousandths(10_050));
        assert_eq!(c.symbol(), "ACB_040524P10.05");
    }
}
