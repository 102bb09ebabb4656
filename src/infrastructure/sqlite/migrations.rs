use crate::domain::error::DomainError;
use rusqlite::Connection;

pub fn run_migrations(conn: &Connection) -> Result<(), DomainError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS quote_records (
            symbol TEXT NOT NULL,
            timestamp INTEGER NOT NULL,
            bid REAL,
            ask REAL,
            last REAL,
            volume INTEGER,
            trade_count INTEGER,
            delta REAL,
            theta REAL,
            vega REAL,
            lambda REAL,
            implied_vol REAL,
            underlying_price REAL,
            PRIMARY KEY (symbol, timestamp)
        );

        CREATE INDEX IF NOT EXISTS idx_quote_records_symbol ON quote_records(symbol);
        "
    ).map_err(|e| DomainError::Database(format!("Migration failed: {e}")))
}
