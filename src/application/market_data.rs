//! Cache-first retrieval of option and stock time series.
//!
//! Every historical path asks the [`QuoteCache`] first and only goes to the
//! [`GreeksDataSource`] on a miss or stale data; whatever is fetched is
//! merged back into the cache before it is returned.

use crate::application::quote_cache::QuoteCache;
use crate::domain::entities::contract::Contract;
use crate::domain::entities::quote::{CacheRecord, GreeksRecord, OpenInterestRecord, QuoteRecord, RecordKind, StrikeGreeks};
use crate::domain::error::DomainError;
use crate::domain::ports::greeks_source::GreeksDataSource;
use crate::domain::values::date_range::DateRange;
use crate::domain::values::right::Right;
use crate::domain::values::strike::Strike;
use crate::domain::values::venue_time::venue_date;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, warn};

/// Which side of the book a fill would take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QuoteSide {
    Bid,
    Ask,
}

impl fmt::Display for QuoteSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuoteSide::Bid => write!(f, "bid"),
            QuoteSide::Ask => write!(f, "ask"),
        }
    }
}

impl FromStr for QuoteSide {
    type Err = String;
    /// Accepts the side itself or an order action: buys (`BTO`, `BTC`) pay
    /// the ask, sells (`STO`, `STC`) hit the bid.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "ASK" | "BTO" | "BTC" => Ok(QuoteSide::Ask),
            "BID" | "STO" | "STC" => Ok(QuoteSide::Bid),
            _ => Err(format!("Unknown quote side or action: {s}")),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PriceAtTime {
    pub side: QuoteSide,
    pub price: f64,
    pub timestamp: i64,
    /// Seconds between the requested time and the quote used.
    pub lag_secs: i64,
}

pub struct MarketDataUseCase {
    source: Arc<dyn GreeksDataSource>,
    cache: Arc<QuoteCache>,
    interval_ms: u32,
}

impl MarketDataUseCase {
    pub fn new(source: Arc<dyn GreeksDataSource>, cache: Arc<QuoteCache>, interval_ms: u32) -> Self {
        Self {
            source,
            cache,
            interval_ms,
        }
    }

    pub fn cache(&self) -> &QuoteCache {
        &self.cache
    }

    /// Greeks series for `contract` over `range`. With `with_trades`, trade
    /// prints for the same seconds are joined in as `last`/`volume`.
    pub async fn option_greeks(
        &self,
        contract: &Contract,
        range: DateRange,
        with_trades: bool,
    ) -> Result<Option<Vec<GreeksRecord>>, DomainError> {
        let symbol = contract.symbol();
        let kind = if with_trades {
            RecordKind::GreeksWithTrades
        } else {
            RecordKind::Greeks
        };
        if let Some(rows) = self.cache.lookup(&symbol, range, kind)? {
            return Ok(Some(rows.iter().filter_map(CacheRecord::to_greeks).collect()));
        }

        info!(%symbol, %range, source = self.source.name(), "fetching greeks");
        let Some(mut greeks) = self.source.historical_greeks(contract, range, self.interval_ms).await? else {
            info!(%symbol, %range, "no greeks data");
            return Ok(None);
        };

        if with_trades {
            match self.source.historical_trades(contract, range).await? {
                Some(trades) => join_trades(&mut greeks, &trades),
                None => info!(%symbol, "no trades to merge"),
            }
        }

        let rows: Vec<CacheRecord> = greeks.iter().map(CacheRecord::from).collect();
        self.cache.merge_and_persist(&symbol, &rows)?;
        Ok(Some(greeks))
    }

    pub async fn option_quotes(
        &self,
        contract: &Contract,
        range: DateRange,
    ) -> Result<Option<Vec<QuoteRecord>>, DomainError> {
        let symbol = contract.symbol();
        if let Some(rows) = self.cache.lookup(&symbol, range, RecordKind::Quotes)? {
            return Ok(Some(rows.iter().filter_map(CacheRecord::to_quote).collect()));
        }
        self.fetch_option_quotes(contract, range).await
    }

    async fn fetch_option_quotes(
        &self,
        contract: &Contract,
        range: DateRange,
    ) -> Result<Option<Vec<QuoteRecord>>, DomainError> {
        let symbol = contract.symbol();
        info!(%symbol, %range, source = self.source.name(), "fetching quotes");
        let Some(quotes) = self.source.historical_quotes(contract, range, self.interval_ms).await? else {
            return Ok(None);
        };
        let quotes = drop_empty_quotes(quotes);
        self.persist_quotes(&symbol, &quotes)?;
        Ok(Some(quotes))
    }

    /// Interval quotes with per-second trade prints joined on, `last`
    /// carried forward between prints.
    pub async fn option_trade_quotes(
        &self,
        contract: &Contract,
        range: DateRange,
    ) -> Result<Option<Vec<QuoteRecord>>, DomainError> {
        let symbol = contract.symbol();
        info!(%symbol, %range, source = self.source.name(), "fetching trades and quotes");
        let Some(trades) = self.source.historical_trades(contract, range).await? else {
            return Ok(None);
        };
        let Some(quotes) = self.source.historical_quotes(contract, range, self.interval_ms).await? else {
            return Ok(None);
        };

        let merged = join_trade_quotes(quotes, &trades);
        self.persist_quotes(&symbol, &merged)?;
        Ok(Some(merged))
    }

    pub async fn stock_quotes(&self, ticker: &str, range: DateRange) -> Result<Option<Vec<QuoteRecord>>, DomainError> {
        let symbol = ticker.trim().to_uppercase();
        if let Some(rows) = self.cache.lookup(&symbol, range, RecordKind::Quotes)? {
            return Ok(Some(rows.iter().filter_map(CacheRecord::to_quote).collect()));
        }

        info!(%symbol, %range, source = self.source.name(), "fetching stock quotes");
        let Some(quotes) = self
            .source
            .historical_stock_quotes(&symbol, range, self.interval_ms)
            .await?
        else {
            return Ok(None);
        };
        let quotes = drop_empty_quotes(quotes);
        self.persist_quotes(&symbol, &quotes)?;
        Ok(Some(quotes))
    }

    /// First quote strictly after `at_time` on the venue day of `at_time`.
    /// Cached rows are used when they bracket `at_time`; otherwise the day is
    /// fetched.
    pub async fn price_at_time(
        &self,
        contract: &Contract,
        at_time: i64,
        side: QuoteSide,
    ) -> Result<Option<PriceAtTime>, DomainError> {
        let day = venue_date(at_time)
            .ok_or_else(|| DomainError::InvalidInput(format!("Timestamp out of range: {at_time}")))?;
        let range = DateRange::single(day);
        let symbol = contract.symbol();

        let cached: Option<Vec<QuoteRecord>> = self
            .cache
            .lookup(&symbol, range, RecordKind::Quotes)?
            .map(|rows| rows.iter().filter_map(CacheRecord::to_quote).collect());

        let quotes = match cached {
            Some(rows) if brackets(&rows, at_time) => rows,
            _ => match self.fetch_option_quotes(contract, range).await? {
                Some(rows) => rows,
                None => return Ok(None),
            },
        };

        let found = first_after(&quotes, at_time, side);
        if found.is_none() {
            warn!(%symbol, at_time, "no quote after requested time");
        }
        Ok(found)
    }

    pub async fn snapshot_greeks(&self, contract: &Contract) -> Result<Option<GreeksRecord>, DomainError> {
        self.source.snapshot_greeks(contract).await
    }

    pub async fn greeks_at(&self, contract: &Contract, at_time: i64) -> Result<Option<GreeksRecord>, DomainError> {
        self.source.at_time_greeks(contract, at_time).await
    }

    /// One read across the chain; not cached.
    pub async fn chain_greeks_at(
        &self,
        root: &str,
        expiration: NaiveDate,
        right: Right,
        at_time: i64,
    ) -> Result<Option<Vec<StrikeGreeks>>, DomainError> {
        self.source.chain_greeks_at(root, expiration, right, at_time).await
    }

    pub async fn open_interest(
        &self,
        contract: &Contract,
        range: DateRange,
    ) -> Result<Option<Vec<OpenInterestRecord>>, DomainError> {
        self.source.open_interest(contract, range).await
    }

    pub async fn expirations(&self, root: &str) -> Result<Option<Vec<NaiveDate>>, DomainError> {
        self.source.list_expirations(root).await
    }

    pub async fn strikes(&self, root: &str, expiration: NaiveDate) -> Result<Option<Vec<Strike>>, DomainError> {
        self.source.list_strikes(root, expiration).await
    }

    fn persist_quotes(&self, symbol: &str, quotes: &[QuoteRecord]) -> Result<(), DomainError> {
        let rows: Vec<CacheRecord> = quotes.iter().map(CacheRecord::from).collect();
        self.cache.merge_and_persist(symbol, &rows)?;
        Ok(())
    }
}

/// Rows where both sides are zero carry no market.
fn drop_empty_quotes(quotes: Vec<QuoteRecord>) -> Vec<QuoteRecord> {
    quotes
        .into_iter()
        .filter(|q| q.bid != 0.0 || q.ask != 0.0)
        .collect()
}

fn brackets(quotes: &[QuoteRecord], at_time: i64) -> bool {
    match (quotes.first(), quotes.last()) {
        (Some(first), Some(last)) => first.timestamp <= at_time && at_time <= last.timestamp,
        _ => false,
    }
}

fn first_after(quotes: &[QuoteRecord], at_time: i64, side: QuoteSide) -> Option<PriceAtTime> {
    let idx = quotes.partition_point(|q| q.timestamp <= at_time);
    let q = quotes.get(idx)?;
    Some(PriceAtTime {
        side,
        price: match side {
            QuoteSide::Bid => q.bid,
            QuoteSide::Ask => q.ask,
        },
        timestamp: q.timestamp,
        lag_secs: q.timestamp - at_time,
    })
}

/// Attach trade `last`/`volume` to greeks rows with the same timestamp.
pub fn join_trades(greeks: &mut [GreeksRecord], trades: &[QuoteRecord]) {
    let by_ts: HashMap<i64, &QuoteRecord> = trades.iter().map(|t| (t.timestamp, t)).collect();
    for row in greeks.iter_mut() {
        if let Some(trade) = by_ts.get(&row.timestamp) {
            row.last = trade.last;
            row.volume = trade.volume;
        }
    }
}

/// Quote rows drive the join; trade fields fill in where a print happened
/// that second, and `last` is carried forward.
pub fn join_trade_quotes(quotes: Vec<QuoteRecord>, trades: &[QuoteRecord]) -> Vec<QuoteRecord> {
    let by_ts: HashMap<i64, &QuoteRecord> = trades.iter().map(|t| (t.timestamp, t)).collect();
    let mut last_seen: Option<f64> = None;
    quotes
        .into_iter()
        .map(|mut q| {
            if let Some(trade) = by_ts.get(&q.timestamp) {
                q.last = trade.last;
                q.volume = trade.volume;
                q.trade_count = trade.trade_count;
            }
            if q.last.is_some() {
                last_seen = q.last;
            } else {
                q.last = last_seen;
            }
            q
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trade(ts: i64, last: f64, volume: i64) -> QuoteRecord {
        QuoteRecord {
            timestamp: ts,
            bid: 0.0,
            ask: 0.0,
            last: Some(last),
            volume: Some(volume),
            trade_count: Some(1),
        }
    }

    #[test]
    fn test_join_trade_quotes_forward_fills_last() {
        let quotes = vec![
            QuoteRecord::new(1, 1.0, 1.2),
            QuoteRecord::new(2, 1.0, 1.2),
            QuoteRecord::new(3, 1.1, 1.3),
            QuoteRecord::new(4, 1.1, 1.3),
        ];
        let merged = join_trade_quotes(quotes, &[trade(2, 1.15, 5), trade(9, 2.0, 1)]);
        assert_eq!(merged.len(), 4, "quote timestamps drive the join");
        assert_eq!(merged[0].last, None);
        assert_eq!(merged[1].last, Some(1.15));
        assert_eq!(merged[1].volume, Some(5));
        assert_eq!(merged[3].last, Some(1.15));
        assert_eq!(merged[3].volume, None);
        assert_eq!(merged[1].ask, 1.2, "quote side comes from quotes");
    }

    #[test]
    fn test_first_after_is_strict() {
        let quotes = vec![QuoteRecord::new(10, 1.0, 1.2), QuoteRecord::new(20, 1.1, 1.3)];
        let hit = first_after(&quotes, 10, QuoteSide::Ask).unwrap();
        assert_eq!(hit.timestamp, 20);
        assert_eq!(hit.price, 1.3);
        assert_eq!(hit.lag_secs, 10);
        assert!(first_after(&quotes, 20, QuoteSide::Bid).is_none());
        assert_eq!(first_after(&quotes, 0, QuoteSide::Bid).unwrap().price, 1.0);
    }

    #[test]
    fn test_side_from_action() {
        assert_eq!("BTO".parse::<QuoteSide>().unwrap(), QuoteSide::Ask);
        assert_eq!("stc".parse::<QuoteSide>().unwrap(), QuoteSide::Bid);
        assert!("hold".parse::<QuoteSide>().is_err());
    }

    #[test]
    fn test_drop_empty_quotes() {
        let kept = drop_empty_quotes(vec![
            QuoteRecord::new(1, 0.0, 0.0),
            QuoteRecord::new(2, 0.0, 0.05),
        ]);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].timestamp, 2);
    }

    #[test]
    fn test_brackets() {
        let quotes = vec![QuoteRecord::new(10, 1.0, 1.2), QuoteRecord::new(20, 1.1, 1.3)];
        assert!(brackets(&quotes, 15));
        assert!(!brackets(&quotes, 25));
        assert!(!brackets(&[], 15));
    }
}
