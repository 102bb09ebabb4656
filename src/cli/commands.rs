use crate::domain::entities::contract::Contract;
use crate::domain::values::date_range::DateRange;
use crate::domain::values::right::Right;
use crate::domain::values::strike::Strike;
use crate::domain::values::venue_time::VENUE_TZ;
use chrono::{NaiveDate, NaiveDateTime, TimeZone};
use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "strikefinder", about = "Delta-targeted strike resolution over a cached greeks feed")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Debug, Clone)]
pub struct ContractArgs {
    /// Underlying root (e.g. SPY)
    pub root: String,
    /// Expiration (YYYY-MM-DD or YYYYMMDD)
    pub expiration: String,
    /// Right (C, P, call, put)
    pub right: String,
    /// Strike price in currency units (e.g. 475.5)
    pub strike: String,
}

impl ContractArgs {
    pub fn to_contract(&self) -> Result<Contract, String> {
        let expiration = parse_date(&self.expiration)?;
        let right: Right = self.right.parse()?;
        let strike: Strike = self.strike.parse()?;
        Ok(Contract::new(self.root.as_str(), expiration, right, strike))
    }
}

#[derive(Args, Debug, Clone)]
pub struct RangeArgs {
    /// First venue date (YYYY-MM-DD or YYYYMMDD)
    pub from: String,
    /// Last venue date; defaults to `from`
    pub to: Option<String>,
}

impl RangeArgs {
    pub fn to_range(&self) -> Result<DateRange, String> {
        let start = parse_date(&self.from)?;
        let end = match &self.to {
            Some(to) => parse_date(to)?,
            None => start,
        };
        DateRange::new(start, end).map_err(|e| e.to_string())
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Find the strike whose delta is closest to a target at a point in time
    DeltaStrike {
        root: String,
        /// Expiration (YYYY-MM-DD or YYYYMMDD)
        expiration: String,
        /// Right (C or P)
        right: String,
        /// Target delta as a fraction (40 delta = 0.4); sign is ignored
        #[arg(allow_hyphen_values = true)]
        delta: f64,
        /// Epoch seconds, RFC3339, or "YYYY-MM-DD HH:MM[:SS]" in venue time
        at: String,
        /// Underlying price at that time, if known
        #[arg(long)]
        spot: Option<f64>,
        /// Pick from one chain-wide greeks read instead of walking strikes
        #[arg(long)]
        chain: bool,
    },
    /// Historical greeks for a contract (cache first)
    Greeks {
        #[command(flatten)]
        contract: ContractArgs,
        #[command(flatten)]
        range: RangeArgs,
        /// Join per-second trade prints onto the greeks rows
        #[arg(long)]
        with_trades: bool,
    },
    /// Historical quotes for a contract (cache first)
    Quotes {
        #[command(flatten)]
        contract: ContractArgs,
        #[command(flatten)]
        range: RangeArgs,
    },
    /// Quotes joined with trade prints for a contract
    TradeQuotes {
        #[command(flatten)]
        contract: ContractArgs,
        #[command(flatten)]
        range: RangeArgs,
    },
    /// Historical quotes for an underlying (cache first)
    StockQuotes {
        ticker: String,
        #[command(flatten)]
        range: RangeArgs,
    },
    /// First quote after a point in time
    PriceAt {
        #[command(flatten)]
        contract: ContractArgs,
        /// Epoch seconds, RFC3339, or "YYYY-MM-DD HH:MM[:SS]" in venue time
        at: String,
        /// bid, ask, or an order action (BTO, BTC, STO, STC)
        #[arg(long, default_value = "ask")]
        side: String,
    },
    /// Latest greeks for a contract, or greeks at a point in time with --at
    Snapshot {
        #[command(flatten)]
        contract: ContractArgs,
        #[arg(long)]
        at: Option<String>,
    },
    /// Open interest reports for a contract
    OpenInterest {
        #[command(flatten)]
        contract: ContractArgs,
        #[command(flatten)]
        range: RangeArgs,
    },
    /// List expirations for a root
    Expirations { root: String },
    /// List strikes for a root and expiration
    Strikes {
        root: String,
        /// Expiration (YYYY-MM-DD or YYYYMMDD)
        expiration: String,
    },
    /// Show cached symbols, or the dates cached for one symbol
    CacheDates { symbol: Option<String> },
}

pub fn parse_date(s: &str) -> Result<NaiveDate, String> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%Y%m%d"))
        .map_err(|_| format!("Invalid date format: {s}. Use YYYY-MM-DD or YYYYMMDD"))
}

/// Epoch seconds from an integer, an RFC3339 string, or a venue-local
/// `YYYY-MM-DD HH:MM[:SS]`.
pub fn parse_time(s: &str) -> Result<i64, String> {
    let s = s.trim();
    if let Ok(secs) = s.parse::<i64>() {
        return Ok(secs);
    }
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(s) {
        return Ok(dt.timestamp());
    }
    let naive = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M"))
        .map_err(|_| format!("Invalid time: {s}. Use epoch seconds, RFC3339, or YYYY-MM-DD HH:MM[:SS]"))?;
    VENUE_TZ
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.timestamp())
        .ok_or_else(|| format!("Time does not exist in venue timezone: {s}"))
}
