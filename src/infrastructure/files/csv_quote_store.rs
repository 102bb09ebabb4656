use crate::domain::entities::quote::CacheRecord;
use crate::domain::error::DomainError;
use crate::domain::ports::quote_store::QuoteStore;
use std::fs;
use std::path::{Path, PathBuf};

/// One `<symbol>.csv` per symbol under a directory. Writes go to a
/// temporary sibling first and are renamed over the target.
pub struct CsvQuoteStore {
    dir: PathBuf,
}

impl CsvQuoteStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, DomainError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .map_err(|e| DomainError::Database(format!("Cannot create cache dir {}: {e}", dir.display())))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, symbol: &str) -> Result<PathBuf, DomainError> {
        if symbol.is_empty() || symbol.contains(['/', '\\']) || symbol.starts_with('.') {
            return Err(DomainError::InvalidInput(format!("Invalid cache symbol: {symbol:?}")));
        }
        Ok(self.dir.join(format!("{symbol}.csv")))
    }
}

impl QuoteStore for CsvQuoteStore {
    fn load(&self, symbol: &str) -> Result<Vec<CacheRecord>, DomainError> {
        let path = self.path_for(symbol)?;
        if !path.exists() {
            return Ok(Vec::new());
        }
        let mut reader = csv::Reader::from_path(&path)?;
        let mut records: Vec<CacheRecord> = reader.deserialize().collect::<Result<_, _>>()?;
        records.sort_by_key(|r| r.timestamp);
        Ok(records)
    }

    fn replace(&self, symbol: &str, records: &[CacheRecord]) -> Result<(), DomainError> {
        let path = self.path_for(symbol)?;
        let tmp = self.dir.join(format!("{symbol}.csv.tmp"));
        {
            let mut writer = csv::Writer::from_path(&tmp)?;
            for record in records {
                writer.serialize(record)?;
            }
            writer.flush()?;
        }
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn symbols(&self) -> Result<Vec<String>, DomainError> {
        let mut symbols = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let name = entry?.file_name();
            if let Some(symbol) = name.to_str().and_then(|n| n.strip_suffix(".csv")) {
                symbols.push(symbol.to_string());
            }
        }
        symbols.sort();
        Ok(symbols)
    }
}
