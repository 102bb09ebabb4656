//! Market-data source port: strikes, expirations, and historical or
//! point-in-time quotes and greeks for option contracts.
//!
//! Every method returns `Ok(None)` when the service reports that it has no
//! data for the contract/range. That is an expected outcome (probing an
//! illiquid strike, listing an unknown root) and callers branch on it.
//! `Ok(Some(vec![]))` is a valid but empty response. `Err` is reserved for
//! transport and parse failures.

use crate::domain::entities::contract::Contract;
use crate::domain::entities::quote::{GreeksRecord, OpenInterestRecord, QuoteRecord, StrikeGreeks};
use crate::domain::error::DomainError;
use crate::domain::values::date_range::DateRange;
use crate::domain::values::right::Right;
use crate::domain::values::strike::Strike;
use async_trait::async_trait;
use chrono::NaiveDate;

pub type SourceResult<T> = Result<Option<T>, DomainError>;

#[async_trait]
pub trait GreeksDataSource: Send + Sync {
    /// Source name for logging.
    fn name(&self) -> &str;

    /// Listed strikes for a root/expiration, ascending.
    async fn list_strikes(&self, root: &str, expiration: NaiveDate) -> SourceResult<Vec<Strike>>;

    async fn list_expirations(&self, root: &str) -> SourceResult<Vec<NaiveDate>>;

    /// Regular-trading-hours greeks sampled every `interval_ms`.
    async fn historical_greeks(
        &self,
        contract: &Contract,
        range: DateRange,
        interval_ms: u32,
    ) -> SourceResult<Vec<GreeksRecord>>;

    /// Trade prints aggregated to one row per second: last bid/ask/price,
    /// summed size as `volume`, number of prints as `trade_count`.
    async fn historical_trades(&self, contract: &Contract, range: DateRange) -> SourceResult<Vec<QuoteRecord>>;

    async fn historical_quotes(
        &self,
        contract: &Contract,
        range: DateRange,
        interval_ms: u32,
    ) -> SourceResult<Vec<QuoteRecord>>;

    /// Quotes for the underlying itself.
    async fn historical_stock_quotes(
        &self,
        root: &str,
        range: DateRange,
        interval_ms: u32,
    ) -> SourceResult<Vec<QuoteRecord>>;

    /// Latest greeks for the contract.
    async fn snapshot_greeks(&self, contract: &Contract) -> SourceResult<GreeksRecord>;

    /// Greeks as of `at_time` (UTC epoch seconds) on that venue day.
    async fn at_time_greeks(&self, contract: &Contract, at_time: i64) -> SourceResult<GreeksRecord>;

    /// Greeks for every listed strike of one right, as of `at_time`, from a
    /// single chain-wide read. Ascending by strike.
    async fn chain_greeks_at(
        &self,
        root: &str,
        expiration: NaiveDate,
        right: Right,
        at_time: i64,
    ) -> SourceResult<Vec<StrikeGreeks>>;

    /// Open interest reports for the contract, one row per report.
    async fn open_interest(&self, contract: &Contract, range: DateRange) -> SourceResult<Vec<OpenInterestRecord>>;
}
