use crate::domain::entities::quote::CacheRecord;
use crate::domain::error::DomainError;
use crate::domain::ports::quote_store::QuoteStore;
use rusqlite::{params, Connection};
use std::sync::Mutex;

const SELECT_COLS: &str = "timestamp, bid, ask, last, volume, trade_count, delta, theta, vega, lambda, implied_vol, underlying_price";

/// Quote cache rows in SQLite, one table keyed by `(symbol, timestamp)`.
pub struct SqliteQuoteStore {
    conn: Mutex<Connection>,
}

impl SqliteQuoteStore {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    fn row_to_record(row: &rusqlite::Row) -> Result<CacheRecord, rusqlite::Error> {
        Ok(CacheRecord {
            timestamp: row.get(0)?,
            bid: row.get(1)?,
            ask: row.get(2)?,
            last: row.get(3)?,
            volume: row.get(4)?,
            trade_count: row.get(5)?,
            delta: row.get(6)?,
            theta: row.get(7)?,
            vega: row.get(8)?,
            lambda: row.get(9)?,
            implied_vol: row.get(10)?,
            underlying_price: row.get(11)?,
        })
    }
}

impl QuoteStore for SqliteQuoteStore {
    fn load(&self, symbol: &str) -> Result<Vec<CacheRecord>, DomainError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| DomainError::Database(e.to_string()))?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {SELECT_COLS} FROM quote_records WHERE symbol = ?1 ORDER BY timestamp ASC"
        ))?;
        let records = stmt
            .query_map(params![symbol], Self::row_to_record)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// Delete and re-insert the symbol's rows inside one transaction.
    fn replace(&self, symbol: &str, records: &[CacheRecord]) -> Result<(), DomainError> {
        let mut conn = self
            .conn
            .lock()
            .map_err(|e| DomainError::Database(e.to_string()))?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM quote_records WHERE symbol = ?1", params![symbol])?;
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO quote_records (symbol, {SELECT_COLS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)"
            ))?;
            for r in records {
                stmt.execute(params![
                    symbol,
                    r.timestamp,
                    r.bid,
                    r.ask,
                    r.last,
                    r.volume,
                    r.trade_count,
                    r.delta,
                    r.theta,
                    r.vega,
                    r.lambda,
                    r.implied_vol,
                    r.underlying_price,
                ])
                .map_err(|e| DomainError::Database(format!("Failed to store {symbol} row {}: {e}", r.timestamp)))?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn symbols(&self) -> Result<Vec<String>, DomainError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| DomainError::Database(e.to_string()))?;
        let mut stmt = conn.prepare("SELECT DISTINCT symbol FROM quote_records ORDER BY symbol")?;
        let symbols = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(symbols)
    }
}
