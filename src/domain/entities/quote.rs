//! Time-series records supplied by the data source and kept in the cache.
//!
//! All timestamps are UTC epoch seconds. Within one symbol a timestamp is
//! unique and series are kept in ascending timestamp order.

use crate::domain::values::strike::Strike;
use serde::{Deserialize, Serialize};

/// Bid/ask quote, optionally enriched with trade prints for the same second.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteRecord {
    pub timestamp: i64,
    pub bid: f64,
    pub ask: f64,
    pub last: Option<f64>,
    pub volume: Option<i64>,
    pub trade_count: Option<i64>,
}

impl QuoteRecord {
    pub fn new(timestamp: i64, bid: f64, ask: f64) -> Self {
        Self {
            timestamp,
            bid,
            ask,
            last: None,
            volume: None,
            trade_count: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GreeksRecord {
    pub timestamp: i64,
    pub bid: f64,
    pub ask: f64,
    pub delta: f64,
    pub theta: f64,
    pub vega: f64,
    pub lambda: f64,
    pub implied_vol: f64,
    pub underlying_price: f64,
    pub last: Option<f64>,
    pub volume: Option<i64>,
}

/// Greeks row for one strike of a chain.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrikeGreeks {
    pub strike: Strike,
    pub record: GreeksRecord,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenInterestRecord {
    pub timestamp: i64,
    pub open_interest: i64,
}

/// Which columns a cache lookup needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Quotes,
    Greeks,
    /// Greeks with trade prints joined in.
    GreeksWithTrades,
}

/// One persisted row: quote columns plus greeks columns when known.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheRecord {
    pub timestamp: i64,
    pub bid: Option<f64>,
    pub ask: Option<f64>,
    pub last: Option<f64>,
    pub volume: Option<i64>,
    pub trade_count: Option<i64>,
    pub delta: Option<f64>,
    pub theta: Option<f64>,
    pub vega: Option<f64>,
    pub lambda: Option<f64>,
    pub implied_vol: Option<f64>,
    pub underlying_price: Option<f64>,
}

impl CacheRecord {
    pub fn has_greeks(&self) -> bool {
        self.delta.is_some()
    }

    pub fn has_trades(&self) -> bool {
        self.last.is_some() || self.volume.is_some()
    }

    pub fn to_quote(&self) -> Option<QuoteRecord> {
        Some(QuoteRecord {
            timestamp: self.timestamp,
            bid: self.bid?,
            ask: self.ask?,
            last: self.last,
            volume: self.volume,
            trade_count: self.trade_count,
        })
    }

    pub fn to_greeks(&self) -> Option<GreeksRecord> {
        Some(GreeksRecord {
            timestamp: self.timestamp,
            bid: self.bid?,
            ask: self.ask?,
            delta: self.delta?,
            theta: self.theta?,
            vega: self.vega?,
            lambda: self.lambda?,
            implied_vol: self.implied_vol?,
            underlying_price: self.underlying_price?,
            last: self.last,
            volume: self.volume,
        })
    }
}

impl From<&QuoteRecord> for CacheRecord {
    fn from(q: &QuoteRecord) -> Self {
        Self {
            timestamp: q.timestamp,
            bid: Some(q.bid),
            ask: Some(q.ask),
            last: q.last,
            volume: q.volume,
            trade_count: q.trade_count,
            delta: None,
            theta: None,
            vega: None,
            lambda: None,
            implied_vol: None,
            underlying_price: None,
        }
    }
}

impl From<&GreeksRecord> for CacheRecord {
    fn from(g: &GreeksRecord) -> Self {
        Self {
            timestamp: g.timestamp,
            bid: Some(g.bid),
            ask: Some(g.ask),
            last: g.last,
            volume: g.volume,
            trade_count: None,
            delta: Some(g.delta),
            theta: Some(g.theta),
            vega: Some(g.vega),
            lambda: Some(g.lambda),
            implied_vol: Some(g.implied_vol),
            underlying_price: Some(g.underlying_price),
        }
    }
}

/// Record closest in time to `at`. Ties go to the earlier record.
pub fn nearest_in_time<T>(records: &[T], at: i64, timestamp: impl Fn(&T) -> i64) -> Option<&T> {
    records
        .iter()
        .min_by_key(|r| (timestamp(r) - at).abs())
}
