use crate::domain::entities::strike_match::StrikeMatch;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Pricing inputs that would make the model produce NaN or infinities.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// The strike search used its whole step budget without converging.
    /// `best` is the closest observation made along the way, if any.
    #[error("Unresolved after {steps} steps{}", describe_best(.best))]
    Unresolved {
        steps: usize,
        best: Option<Box<StrikeMatch>>,
    },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Config error: {0}")]
    Config(String),
}

fn describe_best(best: &Option<Box<StrikeMatch>>) -> String {
    match best {
        Some(b) => format!(" (closest: {} delta {:.3})", b.contract.symbol(), b.observed_delta),
        None => String::new(),
    }
}

impl From<rusqlite::Error> for DomainError {
    fn from(e: rusqlite::Error) -> Self {
        DomainError::Database(e.to_string())
    }
}

impl From<reqwest::Error> for DomainError {
    fn from(e: reqwest::Error) -> Self {
        DomainError::Network(e.to_string())
    }
}

impl From<csv::Error> for DomainError {
    fn from(e: csv::Error) -> Self {
        DomainError::Parse(format!("CSV: {e}"))
    }
}

impl From<std::io::Error> for DomainError {
    fn from(e: std::io::Error) -> Self {
        DomainError::Database(format!("I/O: {e}"))
    }
}

impl From<&str> for DomainError {
    fn from(s: &str) -> Self {
        DomainError::InvalidInput(s.to_string())
    }
}
