//! Shared test helpers: an in-process greeks source with a scripted chain.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use strikefinder::application::delta_strike::ResolverConfig;
use strikefinder::domain::entities::contract::Contract;
use strikefinder::domain::entities::quote::{GreeksRecord, OpenInterestRecord, QuoteRecord, StrikeGreeks};
use strikefinder::domain::ports::greeks_source::{GreeksDataSource, SourceResult};
use strikefinder::domain::ports::quote_store::QuoteStore;
use strikefinder::domain::values::date_range::DateRange;
use strikefinder::domain::values::right::Right;
use strikefinder::domain::values::strike::Strike;
use strikefinder::domain::values::venue_time::{venue_date, venue_timestamp};
use strikefinder::{open_sqlite_store, StrikeFinder};

pub const ROOT: &str = "SPY";

/// 2024-01-02 09:30:00 America/New_York
pub const OPEN_TS: i64 = 1_704_205_800;
/// 2024-01-02 10:00:00 America/New_York
pub const TEN_AM_TS: i64 = OPEN_TS + 1800;

pub fn trade_day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()
}

pub fn expiration() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 19).unwrap()
}

pub fn strikes(prices: impl IntoIterator<Item = i64>) -> Vec<Strike> {
    prices.into_iter().map(|p| Strike::from_price(p as f64)).collect()
}

pub fn contract(right: Right, strike: f64) -> Contract {
    Contract::new(ROOT, expiration(), right, Strike::from_price(strike))
}

/// Greeks source backed by a call-delta table. Put deltas are derived by
/// parity (`call - 1`). Every method call is counted by name.
pub struct FakeSource {
    strikes: Option<Vec<Strike>>,
    call_deltas: HashMap<Strike, f64>,
    underlying: f64,
    no_data: HashSet<Strike>,
    quotes: Vec<QuoteRecord>,
    trades: Vec<QuoteRecord>,
    calls: Mutex<HashMap<&'static str, usize>>,
    greeks_log: Mutex<Vec<Strike>>,
}

impl FakeSource {
    pub fn new(strikes: Vec<Strike>, underlying: f64) -> Self {
        Self {
            strikes: Some(strikes),
            call_deltas: HashMap::new(),
            underlying,
            no_data: HashSet::new(),
            quotes: Vec::new(),
            trades: Vec::new(),
            calls: Mutex::new(HashMap::new()),
            greeks_log: Mutex::new(Vec::new()),
        }
    }

    /// A chain whose call delta falls 0.05 per strike from 0.5 at `atm`,
    /// clamped to [0.01, 0.99].
    pub fn linear_chain(strikes: Vec<Strike>, atm: f64) -> Self {
        let deltas: Vec<(Strike, f64)> = strikes
            .iter()
            .map(|k| (*k, (0.5 - (k.price() - atm) * 0.05).clamp(0.01, 0.99)))
            .collect();
        Self::new(strikes, atm).with_call_deltas(deltas)
    }

    pub fn unlisted() -> Self {
        let mut source = Self::new(Vec::new(), 100.0);
        source.strikes = None;
        source
    }

    pub fn with_call_deltas(mut self, deltas: impl IntoIterator<Item = (Strike, f64)>) -> Self {
        self.call_deltas.extend(deltas);
        self
    }

    pub fn with_no_data(mut self, strikes: impl IntoIterator<Item = Strike>) -> Self {
        self.no_data.extend(strikes);
        self
    }

    pub fn with_quotes(mut self, quotes: Vec<QuoteRecord>) -> Self {
        self.quotes = quotes;
        self
    }

    pub fn with_trades(mut self, trades: Vec<QuoteRecord>) -> Self {
        self.trades = trades;
        self
    }

    pub fn calls(&self, method: &str) -> usize {
        self.calls.lock().unwrap().get(method).copied().unwrap_or(0)
    }

    /// Strikes passed to `historical_greeks`, in call order.
    pub fn greeks_requests(&self) -> Vec<Strike> {
        self.greeks_log.lock().unwrap().clone()
    }

    fn count(&self, method: &'static str) {
        *self.calls.lock().unwrap().entry(method).or_insert(0) += 1;
    }

    fn delta_for(&self, contract: &Contract) -> Option<f64> {
        let call = *self.call_deltas.get(&contract.strike)?;
        Some(match contract.right {
            Right::Call => call,
            Right::Put => call - 1.0,
        })
    }

    fn greeks_row(&self, timestamp: i64, delta: f64) -> GreeksRecord {
        GreeksRecord {
            timestamp,
            bid: 0.95,
            ask: 1.05,
            delta,
            theta: -0.05,
            vega: 0.1,
            lambda: 10.0,
            implied_vol: 0.2,
            underlying_price: self.underlying,
            last: None,
            volume: None,
        }
    }
}

fn days(range: DateRange) -> Vec<NaiveDate> {
    let mut out = Vec::new();
    let mut day = range.start();
    while day <= range.end() {
        out.push(day);
        match day.succ_opt() {
            Some(next) => day = next,
            None => break,
        }
    }
    out
}

fn in_range(rows: &[QuoteRecord], range: DateRange) -> Vec<QuoteRecord> {
    rows.iter()
        .filter(|q| venue_date(q.timestamp).is_some_and(|d| range.contains(d)))
        .cloned()
        .collect()
}

#[async_trait]
impl GreeksDataSource for FakeSource {
    fn name(&self) -> &str {
        "fake"
    }

    async fn list_strikes(&self, _root: &str, _expiration: NaiveDate) -> SourceResult<Vec<Strike>> {
        self.count("list_strikes");
        Ok(self.strikes.clone())
    }

    async fn list_expirations(&self, _root: &str) -> SourceResult<Vec<NaiveDate>> {
        self.count("list_expirations");
        Ok(Some(vec![expiration()]))
    }

    async fn historical_greeks(
        &self,
        contract: &Contract,
        range: DateRange,
        _interval_ms: u32,
    ) -> SourceResult<Vec<GreeksRecord>> {
        self.count("historical_greeks");
        self.greeks_log.lock().unwrap().push(contract.strike);
        if self.no_data.contains(&contract.strike) {
            return Ok(None);
        }
        let Some(delta) = self.delta_for(contract) else {
            return Ok(None);
        };
        // 09:30, 10:00 and 15:59 each day
        let rows = days(range)
            .into_iter()
            .flat_map(|day| {
                [34_200_000, 36_000_000, 57_540_000]
                    .into_iter()
                    .filter_map(move |ms| venue_timestamp(day, ms))
            })
            .map(|ts| self.greeks_row(ts, delta))
            .collect();
        Ok(Some(rows))
    }

    async fn historical_trades(&self, _contract: &Contract, range: DateRange) -> SourceResult<Vec<QuoteRecord>> {
        self.count("historical_trades");
        Ok(Some(in_range(&self.trades, range)))
    }

    async fn historical_quotes(
        &self,
        _contract: &Contract,
        range: DateRange,
        _interval_ms: u32,
    ) -> SourceResult<Vec<QuoteRecord>> {
        self.count("historical_quotes");
        if self.quotes.is_empty() {
            return Ok(None);
        }
        Ok(Some(in_range(&self.quotes, range)))
    }

    async fn historical_stock_quotes(
        &self,
        _root: &str,
        range: DateRange,
        _interval_ms: u32,
    ) -> SourceResult<Vec<QuoteRecord>> {
        self.count("historical_stock_quotes");
        if self.quotes.is_empty() {
            return Ok(None);
        }
        Ok(Some(in_range(&self.quotes, range)))
    }

    async fn snapshot_greeks(&self, contract: &Contract) -> SourceResult<GreeksRecord> {
        self.count("snapshot_greeks");
        Ok(self.delta_for(contract).map(|d| self.greeks_row(TEN_AM_TS, d)))
    }

    async fn at_time_greeks(&self, contract: &Contract, at_time: i64) -> SourceResult<GreeksRecord> {
        self.count("at_time_greeks");
        Ok(self.delta_for(contract).map(|d| self.greeks_row(at_time, d)))
    }

    async fn chain_greeks_at(
        &self,
        root: &str,
        expiration: NaiveDate,
        right: Right,
        at_time: i64,
    ) -> SourceResult<Vec<StrikeGreeks>> {
        self.count("chain_greeks_at");
        let Some(listed) = &self.strikes else {
            return Ok(None);
        };
        let mut rows: Vec<StrikeGreeks> = listed
            .iter()
            .filter(|k| !self.no_data.contains(k))
            .filter_map(|k| {
                let c = Contract::new(root, expiration, right, *k);
                self.delta_for(&c).map(|d| StrikeGreeks {
                    strike: *k,
                    record: self.greeks_row(at_time, d),
                })
            })
            .collect();
        rows.sort_by_key(|r| r.strike);
        Ok(Some(rows))
    }

    async fn open_interest(&self, contract: &Contract, range: DateRange) -> SourceResult<Vec<OpenInterestRecord>> {
        self.count("open_interest");
        if self.delta_for(contract).is_none() {
            return Ok(None);
        }
        // one 06:30 report per day
        let rows = days(range)
            .into_iter()
            .filter_map(|day| venue_timestamp(day, 23_400_000))
            .map(|timestamp| OpenInterestRecord {
                timestamp,
                open_interest: 1520,
            })
            .collect();
        Ok(Some(rows))
    }
}

/// Tight tolerance so tests see the walk, not just the first probe.
pub fn tight_config() -> ResolverConfig {
    ResolverConfig {
        tolerance: 0.01,
        ..ResolverConfig::default()
    }
}

pub fn memory_store() -> Arc<dyn QuoteStore> {
    Arc::new(open_sqlite_store(":memory:").unwrap())
}

pub fn setup(source: Arc<FakeSource>, config: ResolverConfig) -> StrikeFinder {
    StrikeFinder::with_providers(source, memory_store(), 1000, config)
}
