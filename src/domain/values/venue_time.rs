//! Trading-venue calendar.
//!
//! Market-data rows are stamped with a venue-local date and milliseconds
//! since venue midnight. Everything persisted uses UTC epoch seconds; these
//! helpers convert between the two, DST-aware.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Timelike};
use chrono_tz::Tz;

use crate::domain::error::DomainError;

pub const VENUE_TZ: Tz = chrono_tz::America::New_York;

/// Regular-session close, in venue-local time.
pub const MARKET_CLOSE_HOUR: u32 = 16;

pub fn venue_datetime(timestamp: i64) -> Option<DateTime<Tz>> {
    DateTime::from_timestamp(timestamp, 0).map(|dt| dt.with_timezone(&VENUE_TZ))
}

/// Calendar date on the venue's clock for a UTC epoch timestamp.
pub fn venue_date(timestamp: i64) -> Option<NaiveDate> {
    venue_datetime(timestamp).map(|dt| dt.date_naive())
}

/// Milliseconds since venue midnight.
pub fn ms_of_day(timestamp: i64) -> Option<i64> {
    venue_datetime(timestamp).map(|dt| dt.num_seconds_from_midnight() as i64 * 1000)
}

/// UTC epoch seconds for a venue-local `date` + `ms_of_day`, truncated to the second.
pub fn venue_timestamp(date: NaiveDate, ms_of_day: i64) -> Option<i64> {
    let midnight: NaiveDateTime = date.and_hms_opt(0, 0, 0)?;
    let local = midnight.checked_add_signed(Duration::milliseconds(ms_of_day))?;
    VENUE_TZ
        .from_local_datetime(&local)
        .earliest()
        .map(|dt| dt.timestamp())
}

/// UTC epoch seconds of the regular-session close on `date`.
pub fn market_close(date: NaiveDate) -> Option<i64> {
    venue_timestamp(date, MARKET_CLOSE_HOUR as i64 * 3_600_000)
}

pub fn parse_yyyymmdd(s: &str) -> Result<NaiveDate, DomainError> {
    NaiveDate::parse_from_str(s.trim(), "%Y%m%d")
        .map_err(|e| DomainError::Parse(format!("Invalid date '{s}': {e}")))
}

pub fn format_yyyymmdd(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}
