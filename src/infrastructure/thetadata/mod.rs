pub mod parse;

use crate::domain::entities::contract::Contract;
use crate::domain::entities::quote::{GreeksRecord, OpenInterestRecord, QuoteRecord, StrikeGreeks};
use crate::domain::error::DomainError;
use crate::domain::ports::greeks_source::{GreeksDataSource, SourceResult};
use crate::domain::values::date_range::DateRange;
use crate::domain::values::right::Right;
use crate::domain::values::strike::Strike;
use crate::domain::values::venue_time::{format_yyyymmdd, ms_of_day, parse_yyyymmdd, venue_date};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:25510";

/// Client for a ThetaData terminal's REST v2 API.
pub struct ThetaDataClient {
    base_url: String,
    client: reqwest::Client,
}

type Query = Vec<(&'static str, String)>;

impl ThetaDataClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, DomainError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DomainError::Config(format!("HTTP client: {e}")))?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET `path`; `None` when the body is the no-data sentinel.
    async fn get(&self, path: &str, query: &Query) -> Result<Option<String>, DomainError> {
        let url = format!("{}{path}", self.base_url);
        debug!(%url, ?query, "thetadata request");

        let resp = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .query(query)
            .send()
            .await?;
        let status = resp.status();
        let body = resp.text().await?;

        if parse::is_no_data(&body) {
            debug!(%url, "no data");
            return Ok(None);
        }
        if !status.is_success() {
            return Err(DomainError::Network(format!("ThetaData returned {status} for {path}")));
        }
        Ok(Some(body))
    }

    async fn get_csv(&self, path: &str, mut query: Query) -> Result<Option<String>, DomainError> {
        query.push(("use_csv", "true".into()));
        self.get(path, &query).await
    }

    /// Whole-chain greeks for one right at the venue time of `at_time`.
    async fn bulk_at_time(
        &self,
        root: &str,
        expiration: NaiveDate,
        right: Right,
        at_time: i64,
    ) -> Result<Option<String>, DomainError> {
        let (Some(day), Some(ms)) = (venue_date(at_time), ms_of_day(at_time)) else {
            return Err(DomainError::InvalidInput(format!("Timestamp out of range: {at_time}")));
        };
        let mut query = vec![
            ("root", root.trim().to_uppercase()),
            ("exp", format_yyyymmdd(expiration)),
            ("right", right.code().to_string()),
        ];
        query.extend(range_query(DateRange::single(day)));
        query.push(("ivl", ms.to_string()));
        self.get_csv("/v2/bulk_at_time/option/greeks", query).await
    }
}

fn contract_query(contract: &Contract) -> Query {
    vec![
        ("root", contract.root.clone()),
        ("exp", format_yyyymmdd(contract.expiration)),
        ("right", contract.right.code().to_string()),
        ("strike", contract.strike.thousandths().to_string()),
    ]
}

fn range_query(range: DateRange) -> Query {
    vec![
        ("start_date", format_yyyymmdd(range.start())),
        ("end_date", format_yyyymmdd(range.end())),
    ]
}

fn chain_query(contract: &Contract) -> Query {
    vec![
        ("root", contract.root.clone()),
        ("exp", format_yyyymmdd(contract.expiration)),
        ("right", contract.right.code().to_string()),
    ]
}

#[async_trait]
impl GreeksDataSource for ThetaDataClient {
    fn name(&self) -> &str {
        "thetadata"
    }

    async fn list_strikes(&self, root: &str, expiration: NaiveDate) -> SourceResult<Vec<Strike>> {
        let query = vec![("root", root.to_uppercase()), ("exp", format_yyyymmdd(expiration))];
        let Some(body) = self.get("/v2/list/strikes", &query).await? else {
            return Ok(None);
        };
        let strikes = parse::parse_list::<i64>(&body)?
            .into_iter()
            .map(Strike::from_thousandths)
            .collect();
        Ok(Some(strikes))
    }

    async fn list_expirations(&self, root: &str) -> SourceResult<Vec<NaiveDate>> {
        let query = vec![("root", root.to_uppercase())];
        let Some(body) = self.get("/v2/list/expirations", &query).await? else {
            return Ok(None);
        };
        let dates = parse::parse_list::<i64>(&body)?
            .into_iter()
            .map(|d| parse_yyyymmdd(&d.to_string()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Some(dates))
    }

    async fn historical_greeks(
        &self,
        contract: &Contract,
        range: DateRange,
        interval_ms: u32,
    ) -> SourceResult<Vec<GreeksRecord>> {
        let mut query = contract_query(contract);
        query.extend(range_query(range));
        query.push(("rth", "true".into()));
        query.push(("ivl", interval_ms.to_string()));
        match self.get_csv("/v2/hist/option/greeks", query).await? {
            Some(body) => Ok(Some(parse::parse_greeks(&body)?)),
            None => Ok(None),
        }
    }

    async fn historical_trades(&self, contract: &Contract, range: DateRange) -> SourceResult<Vec<QuoteRecord>> {
        let mut query = contract_query(contract);
        query.extend(range_query(range));
        query.push(("rth", "true".into()));
        match self.get_csv("/v2/hist/option/trade_quote", query).await? {
            Some(body) => Ok(Some(parse::parse_trades(&body)?)),
            None => Ok(None),
        }
    }

    async fn historical_quotes(
        &self,
        contract: &Contract,
        range: DateRange,
        interval_ms: u32,
    ) -> SourceResult<Vec<QuoteRecord>> {
        let mut query = contract_query(contract);
        query.extend(range_query(range));
        query.push(("ivl", interval_ms.to_string()));
        match self.get_csv("/v2/hist/option/quote", query).await? {
            Some(body) => Ok(Some(parse::parse_quotes(&body)?)),
            None => Ok(None),
        }
    }

    async fn historical_stock_quotes(
        &self,
        root: &str,
        range: DateRange,
        interval_ms: u32,
    ) -> SourceResult<Vec<QuoteRecord>> {
        let mut query = vec![("root", root.to_uppercase())];
        query.extend(range_query(range));
        query.push(("ivl", interval_ms.to_string()));
        query.push(("rth", "false".into()));
        match self.get_csv("/v2/hist/stock/quote", query).await? {
            Some(body) => Ok(Some(parse::parse_quotes(&body)?)),
            None => Ok(None),
        }
    }

    async fn snapshot_greeks(&self, contract: &Contract) -> SourceResult<GreeksRecord> {
        let Some(body) = self
            .get_csv("/v2/bulk_snapshot/option/greeks", chain_query(contract))
            .await?
        else {
            return Ok(None);
        };
        let rows = parse::parse_bulk_greeks(&body, contract.strike, contract.right)?;
        Ok(rows.into_iter().next())
    }

    async fn at_time_greeks(&self, contract: &Contract, at_time: i64) -> SourceResult<GreeksRecord> {
        let Some(body) = self
            .bulk_at_time(&contract.root, contract.expiration, contract.right, at_time)
            .await?
        else {
            return Ok(None);
        };
        let rows = parse::parse_bulk_greeks(&body, contract.strike, contract.right)?;
        Ok(rows.into_iter().next())
    }

    async fn chain_greeks_at(
        &self,
        root: &str,
        expiration: NaiveDate,
        right: Right,
        at_time: i64,
    ) -> SourceResult<Vec<StrikeGreeks>> {
        match self.bulk_at_time(root, expiration, right, at_time).await? {
            Some(body) => Ok(Some(parse::parse_chain_greeks(&body, right)?)),
            None => Ok(None),
        }
    }

    async fn open_interest(&self, contract: &Contract, range: DateRange) -> SourceResult<Vec<OpenInterestRecord>> {
        let mut query = contract_query(contract);
        query.extend(range_query(range));
        match self.get_csv("/v2/hist/option/open_interest", query).await? {
            Some(body) => Ok(Some(parse::parse_open_interest(&body)?)),
            None => Ok(None),
        }
    }
}
