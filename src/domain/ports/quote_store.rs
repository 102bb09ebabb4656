use crate::domain::entities::quote::CacheRecord;
use crate::domain::error::DomainError;

/// Per-symbol storage behind the quote cache.
///
/// Implementations must make `replace` atomic: a reader sees either the
/// old series or the new one, never a mix. Read-merge-write across calls is
/// not locked; callers working on the same symbol serialize themselves.
pub trait QuoteStore: Send + Sync {
    /// All rows for `symbol`, ascending by timestamp. Empty if none stored.
    fn load(&self, symbol: &str) -> Result<Vec<CacheRecord>, DomainError>;

    /// Replace the stored series for `symbol` with `records`.
    fn replace(&self, symbol: &str, records: &[CacheRecord]) -> Result<(), DomainError>;

    /// Symbols with at least one stored row.
    fn symbols(&self) -> Result<Vec<String>, DomainError>;
}
