//! Strike price value object.
//!
//! Market-data services quote strikes as integers in thousandths of a
//! currency unit (`$475.50` → `475500`), while spot prices and the pricing
//! model work in whole units. `Strike` keeps the integer form for exact
//! comparison and ordering and converts explicitly at the edges.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const THOUSANDTHS_PER_UNIT: i64 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Strike(i64);

impl Strike {
    pub fn from_thousandths(value: i64) -> Self {
        Strike(value)
    }

    /// Round a price in currency units to the nearest thousandth.
    pub fn from_price(price: f64) -> Self {
        Strike((price * THOUSANDTHS_PER_UNIT as f64).round() as i64)
    }

    pub fn thousandths(&self) -> i64 {
        self.0
    }

    pub fn price(&self) -> f64 {
        self.0 as f64 / THOUSANDTHS_PER_UNIT as f64
    }
}

impl fmt::Display for Strike {
    /// Decimal price without redundant trailing zeros: `100`, `6.5`, `10.05`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let whole = abs / THOUSANDTHS_PER_UNIT as u64;
        let frac = abs % THOUSANDTHS_PER_UNIT as u64;
        if frac == 0 {
            return write!(f, "{sign}{whole}");
        }
        let digits = format!("{frac:03}");
        write!(f, "{sign}{whole}.{}", digits.trim_end_matches('0'))
    }
}

impl FromStr for Strike {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let price: f64 = s
            .trim()
            .parse()
            .map_err(|_| format!("Invalid strike: {s}"))?;
        if !price.is_finite() || price <= 0.0 {
            return Err(format!("Strike must be a positive price, got {s}"));
        }
        Ok(Strike::from_price(price))
    }
}
