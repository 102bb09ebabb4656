//! Decoding of ThetaData REST v2 responses.
//!
//! Historical and bulk endpoints answer in CSV (`use_csv=true`) with a
//! venue-local `date` (YYYYMMDD) and `ms_of_day`; list endpoints answer in
//! JSON. A plain-text body starting with `No data for` means the service
//! has nothing for the request.

use crate::domain::entities::quote::{GreeksRecord, OpenInterestRecord, QuoteRecord, StrikeGreeks};
use crate::domain::error::DomainError;
use crate::domain::values::right::Right;
use crate::domain::values::strike::Strike;
use crate::domain::values::venue_time::{parse_yyyymmdd, venue_timestamp};
use serde::de::DeserializeOwned;
use serde::Deserialize;

const NO_DATA_PREFIX: &str = "No data for";

pub fn is_no_data(body: &str) -> bool {
    body.trim_start().starts_with(NO_DATA_PREFIX)
}

#[derive(Debug, Deserialize)]
struct ListResponse<T> {
    response: Vec<T>,
}

pub fn parse_list<T: DeserializeOwned>(body: &str) -> Result<Vec<T>, DomainError> {
    let parsed: ListResponse<T> =
        serde_json::from_str(body).map_err(|e| DomainError::Parse(format!("List response: {e}")))?;
    Ok(parsed.response)
}

/// Convert a `date` + `ms_of_day` pair to UTC epoch seconds.
fn row_timestamp(date: f64, ms_of_day: f64) -> Result<i64, DomainError> {
    let day = parse_yyyymmdd(&format!("{}", date as i64))?;
    venue_timestamp(day, ms_of_day as i64)
        .ok_or_else(|| DomainError::Parse(format!("Invalid time {date} + {ms_of_day}ms")))
}

fn read_rows<T: DeserializeOwned>(body: &str) -> Result<Vec<T>, DomainError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(body.as_bytes());
    Ok(reader.deserialize().collect::<Result<Vec<T>, _>>()?)
}

#[derive(Debug, Deserialize)]
struct GreeksRow {
    date: f64,
    ms_of_day: f64,
    bid: f64,
    ask: f64,
    delta: f64,
    theta: f64,
    vega: f64,
    lambda: f64,
    implied_vol: f64,
    underlying_price: f64,
    #[serde(default)]
    strike: Option<f64>,
    #[serde(default)]
    right: Option<String>,
}

impl GreeksRow {
    fn into_record(self) -> Result<GreeksRecord, DomainError> {
        Ok(GreeksRecord {
            timestamp: row_timestamp(self.date, self.ms_of_day)?,
            bid: self.bid,
            ask: self.ask,
            delta: self.delta,
            theta: self.theta,
            vega: self.vega,
            lambda: self.lambda,
            implied_vol: self.implied_vol,
            underlying_price: self.underlying_price,
            last: None,
            volume: None,
        })
    }

    fn row_strike(&self) -> Option<Strike> {
        self.strike.map(|s| Strike::from_thousandths(s.round() as i64))
    }

    fn is_right(&self, right: Right) -> bool {
        self.right
            .as_deref()
            .and_then(|r| r.parse::<Right>().ok())
            .is_some_and(|r| r == right)
    }

    fn matches(&self, strike: Strike, right: Right) -> bool {
        self.row_strike() == Some(strike) && self.is_right(right)
    }
}

pub fn parse_greeks(body: &str) -> Result<Vec<GreeksRecord>, DomainError> {
    read_rows::<GreeksRow>(body)?
        .into_iter()
        .map(GreeksRow::into_record)
        .collect()
}

/// Bulk responses cover a whole chain; keep the rows for one contract.
pub fn parse_bulk_greeks(body: &str, strike: Strike, right: Right) -> Result<Vec<GreeksRecord>, DomainError> {
    read_rows::<GreeksRow>(body)?
        .into_iter()
        .filter(|row| row.matches(strike, right))
        .map(GreeksRow::into_record)
        .collect()
}

/// Every strike of one right from a bulk response, ascending by strike.
pub fn parse_chain_greeks(body: &str, right: Right) -> Result<Vec<StrikeGreeks>, DomainError> {
    let mut rows = Vec::new();
    for row in read_rows::<GreeksRow>(body)? {
        if !row.is_right(right) {
            continue;
        }
        let Some(strike) = row.row_strike() else { continue };
        rows.push(StrikeGreeks {
            strike,
            record: row.into_record()?,
        });
    }
    rows.sort_by_key(|r| r.strike);
    Ok(rows)
}

#[derive(Debug, Deserialize)]
struct OpenInterestRow {
    date: f64,
    ms_of_day: f64,
    open_interest: i64,
}

pub fn parse_open_interest(body: &str) -> Result<Vec<OpenInterestRecord>, DomainError> {
    read_rows::<OpenInterestRow>(body)?
        .into_iter()
        .map(|row| {
            Ok(OpenInterestRecord {
                timestamp: row_timestamp(row.date, row.ms_of_day)?,
                open_interest: row.open_interest,
            })
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct QuoteRow {
    date: f64,
    ms_of_day: f64,
    bid: f64,
    ask: f64,
}

pub fn parse_quotes(body: &str) -> Result<Vec<QuoteRecord>, DomainError> {
    read_rows::<QuoteRow>(body)?
        .into_iter()
        .map(|row| Ok(QuoteRecord::new(row_timestamp(row.date, row.ms_of_day)?, row.bid, row.ask)))
        .collect()
}

#[derive(Debug, Deserialize)]
struct TradeQuoteRow {
    date: f64,
    ms_of_day: f64,
    size: i64,
    price: f64,
    bid: f64,
    ask: f64,
}

/// Trade prints rolled up to one row per second: the last print's
/// bid/ask/price, total size and number of prints.
pub fn parse_trades(body: &str) -> Result<Vec<QuoteRecord>, DomainError> {
    let mut out: Vec<QuoteRecord> = Vec::new();
    for row in read_rows::<TradeQuoteRow>(body)? {
        let ts = row_timestamp(row.date, row.ms_of_day)?;
        match out.last_mut() {
            Some(agg) if agg.timestamp == ts => {
                agg.bid = row.bid;
                agg.ask = row.ask;
                agg.last = Some(row.price);
                agg.volume = Some(agg.volume.unwrap_or(0) + row.size);
                agg.trade_count = Some(agg.trade_count.unwrap_or(0) + 1);
            }
            _ => out.push(QuoteRecord {
                timestamp: ts,
                bid: row.bid,
                ask: row.ask,
                last: Some(row.price),
                volume: Some(row.size),
                trade_count: Some(1),
            }),
        }
    }
    Ok(out)
}
