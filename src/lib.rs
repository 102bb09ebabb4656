pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

use crate::application::delta_strike::{DeltaStrikeRequest, DeltaStrikeResolver, ResolverConfig};
use crate::application::market_data::{MarketDataUseCase, PriceAtTime, QuoteSide};
use crate::application::quote_cache::QuoteCache;
use crate::config::{CacheBackend, Config};
use crate::domain::entities::contract::Contract;
use crate::domain::entities::quote::{GreeksRecord, OpenInterestRecord, QuoteRecord};
use crate::domain::entities::strike_match::StrikeMatch;
use crate::domain::error::DomainError;
use crate::domain::ports::greeks_source::GreeksDataSource;
use crate::domain::ports::quote_store::QuoteStore;
use crate::domain::values::date_range::DateRange;
use crate::domain::values::strike::Strike;
use crate::infrastructure::files::csv_quote_store::CsvQuoteStore;
use crate::infrastructure::sqlite::migrations::run_migrations;
use crate::infrastructure::sqlite::quote_store::SqliteQuoteStore;
use crate::infrastructure::thetadata::ThetaDataClient;
use chrono::NaiveDate;
use rusqlite::Connection;
use std::collections::BTreeSet;
use std::sync::Arc;

pub struct StrikeFinder {
    market_uc: Arc<MarketDataUseCase>,
    resolver: DeltaStrikeResolver,
}

impl StrikeFinder {
    /// Wire the ThetaData client and the configured cache backend.
    pub fn new(config: &Config) -> Result<Self, DomainError> {
        let source: Arc<dyn GreeksDataSource> =
            Arc::new(ThetaDataClient::new(config.base_url.clone(), config.request_timeout)?);
        let store: Arc<dyn QuoteStore> = match &config.cache {
            CacheBackend::Sqlite(path) => Arc::new(open_sqlite_store(path)?),
            CacheBackend::Csv(dir) => Arc::new(CsvQuoteStore::new(dir.as_str())?),
        };
        Ok(Self::with_providers(source, store, config.interval_ms, config.resolver))
    }

    pub fn with_providers(
        source: Arc<dyn GreeksDataSource>,
        store: Arc<dyn QuoteStore>,
        interval_ms: u32,
        resolver_config: ResolverConfig,
    ) -> Self {
        let cache = Arc::new(QuoteCache::new(store));
        let market_uc = Arc::new(MarketDataUseCase::new(source, cache, interval_ms));
        Self {
            resolver: DeltaStrikeResolver::new(market_uc.clone(), resolver_config),
            market_uc,
        }
    }

    // Delegating methods
    pub async fn delta_strike(&self, request: &DeltaStrikeRequest) -> Result<StrikeMatch, DomainError> {
        self.resolver.resolve(request).await
    }

    pub async fn delta_strike_at_time(&self, request: &DeltaStrikeRequest) -> Result<StrikeMatch, DomainError> {
        self.resolver.resolve_at_time(request).await
    }

    pub async fn option_greeks(
        &self,
        contract: &Contract,
        range: DateRange,
        with_trades: bool,
    ) -> Result<Option<Vec<GreeksRecord>>, DomainError> {
        self.market_uc.option_greeks(contract, range, with_trades).await
    }

    pub async fn option_quotes(&self, contract: &Contract, range: DateRange) -> Result<Option<Vec<QuoteRecord>>, DomainError> {
        self.market_uc.option_quotes(contract, range).await
    }

    pub async fn option_trade_quotes(
        &self,
        contract: &Contract,
        range: DateRange,
    ) -> Result<Option<Vec<QuoteRecord>>, DomainError> {
        self.market_uc.option_trade_quotes(contract, range).await
    }

    pub async fn stock_quotes(&self, ticker: &str, range: DateRange) -> Result<Option<Vec<QuoteRecord>>, DomainError> {
        self.market_uc.stock_quotes(ticker, range).await
    }

    pub async fn price_at_time(
        &self,
        contract: &Contract,
        at_time: i64,
        side: QuoteSide,
    ) -> Result<Option<PriceAtTime>, DomainError> {
        self.market_uc.price_at_time(contract, at_time, side).await
    }

    pub async fn snapshot_greeks(&self, contract: &Contract) -> Result<Option<GreeksRecord>, DomainError> {
        self.market_uc.snapshot_greeks(contract).await
    }

    pub async fn greeks_at(&self, contract: &Contract, at_time: i64) -> Result<Option<GreeksRecord>, DomainError> {
        self.market_uc.greeks_at(contract, at_time).await
    }

    pub async fn open_interest(
        &self,
        contract: &Contract,
        range: DateRange,
    ) -> Result<Option<Vec<OpenInterestRecord>>, DomainError> {
        self.market_uc.open_interest(contract, range).await
    }

    pub async fn expirations(&self, root: &str) -> Result<Option<Vec<NaiveDate>>, DomainError> {
        self.market_uc.expirations(root).await
    }

    pub async fn strikes(&self, root: &str, expiration: NaiveDate) -> Result<Option<Vec<Strike>>, DomainError> {
        self.market_uc.strikes(root, expiration).await
    }

    pub fn cached_symbols(&self) -> Result<Vec<String>, DomainError> {
        self.market_uc.cache().symbols()
    }

    pub fn cached_dates(&self, symbol: &str) -> Result<BTreeSet<NaiveDate>, DomainError> {
        self.market_uc.cache().covered_dates(symbol)
    }
}

pub fn open_sqlite_store(db_path: &str) -> Result<SqliteQuoteStore, DomainError> {
    let conn = Connection::open(db_path).map_err(|e| DomainError::Database(format!("DB error: {e}")))?;
    conn.pragma_update(None, "journal_mode", "WAL")
        .map_err(|e| DomainError::Database(format!("WAL error: {e}")))?;
    run_migrations(&conn)?;
    Ok(SqliteQuoteStore::new(conn))
}
