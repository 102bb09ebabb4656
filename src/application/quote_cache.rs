//! Per-symbol quote/greeks cache.
//!
//! A symbol's series is only ever extended: new batches are merged in by
//! timestamp (incoming rows win) and the whole series is replaced
//! atomically through the [`QuoteStore`]. A lookup is served only when both
//! ends of the requested range are covered days; interior gaps are not
//! patched, the caller refetches the whole range instead.

use crate::domain::entities::quote::{CacheRecord, RecordKind};
use crate::domain::error::DomainError;
use crate::domain::ports::quote_store::QuoteStore;
use crate::domain::values::date_range::DateRange;
use crate::domain::values::venue_time::venue_date;
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq)]
pub enum StaleReason {
    /// The rows were cached by a quotes-only request.
    MissingGreeks,
    /// Greeks were cached without trade prints joined in.
    MissingTrades,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CacheLookup {
    Hit(Vec<CacheRecord>),
    Miss,
    Stale(StaleReason),
}

pub struct QuoteCache {
    store: Arc<dyn QuoteStore>,
}

impl QuoteCache {
    pub fn new(store: Arc<dyn QuoteStore>) -> Self {
        Self { store }
    }

    /// Distinct venue dates present in the cached series.
    pub fn covered_dates(&self, symbol: &str) -> Result<BTreeSet<NaiveDate>, DomainError> {
        let records = self.store.load(symbol)?;
        Ok(dates_of(&records))
    }

    pub fn symbols(&self) -> Result<Vec<String>, DomainError> {
        self.store.symbols()
    }

    pub fn probe(&self, symbol: &str, range: DateRange, kind: RecordKind) -> Result<CacheLookup, DomainError> {
        let records = self.store.load(symbol)?;
        if records.is_empty() {
            debug!(symbol, "cache empty");
            return Ok(CacheLookup::Miss);
        }

        let covered = dates_of(&records);
        if !covered.contains(&range.start()) || !covered.contains(&range.end()) {
            debug!(symbol, %range, "cache does not cover range endpoints");
            return Ok(CacheLookup::Miss);
        }

        let in_range: Vec<CacheRecord> = records
            .into_iter()
            .filter(|r| venue_date(r.timestamp).is_some_and(|d| range.contains(d)))
            .collect();

        let wants_greeks = matches!(kind, RecordKind::Greeks | RecordKind::GreeksWithTrades);
        if wants_greeks && !in_range.iter().any(CacheRecord::has_greeks) {
            info!(symbol, %range, "cached rows have no greeks, treating as stale");
            return Ok(CacheLookup::Stale(StaleReason::MissingGreeks));
        }
        if kind == RecordKind::GreeksWithTrades && !in_range.iter().any(CacheRecord::has_trades) {
            info!(symbol, %range, "cached greeks have no trades joined, treating as stale");
            return Ok(CacheLookup::Stale(StaleReason::MissingTrades));
        }

        info!(symbol, %range, rows = in_range.len(), "cache hit");
        Ok(CacheLookup::Hit(in_range))
    }

    /// Cached rows for `range`, or `None` on a miss or stale data.
    pub fn lookup(
        &self,
        symbol: &str,
        range: DateRange,
        kind: RecordKind,
    ) -> Result<Option<Vec<CacheRecord>>, DomainError> {
        match self.probe(symbol, range, kind)? {
            CacheLookup::Hit(records) => Ok(Some(records)),
            CacheLookup::Miss | CacheLookup::Stale(_) => Ok(None),
        }
    }

    /// Merge `new_records` into the stored series and persist it.
    /// Returns the number of rows now stored for `symbol`.
    pub fn merge_and_persist(&self, symbol: &str, new_records: &[CacheRecord]) -> Result<usize, DomainError> {
        let existing = self.store.load(symbol)?;
        if new_records.is_empty() {
            return Ok(existing.len());
        }

        let merged = merge_records(existing, new_records);
        self.store.replace(symbol, &merged)?;
        debug!(symbol, added = new_records.len(), total = merged.len(), "cache persisted");
        Ok(merged.len())
    }
}

fn dates_of(records: &[CacheRecord]) -> BTreeSet<NaiveDate> {
    records.iter().filter_map(|r| venue_date(r.timestamp)).collect()
}

/// Union by timestamp, incoming rows replacing existing ones, ascending.
pub fn merge_records(existing: Vec<CacheRecord>, incoming: &[CacheRecord]) -> Vec<CacheRecord> {
    let mut by_ts: BTreeMap<i64, CacheRecord> = existing.into_iter().map(|r| (r.timestamp, r)).collect();
    for record in incoming {
        by_ts.insert(record.timestamp, record.clone());
    }
    by_ts.into_values().collect()
}
