//! Runtime configuration from `STRIKEFINDER_*` environment variables.

use crate::application::delta_strike::ResolverConfig;
use crate::domain::error::DomainError;
use crate::domain::values::black_scholes::PricingInputs;
use crate::infrastructure::thetadata::DEFAULT_BASE_URL;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheBackend {
    Sqlite(String),
    Csv(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub base_url: String,
    pub cache: CacheBackend,
    pub interval_ms: u32,
    pub request_timeout: Duration,
    pub resolver: ResolverConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            cache: CacheBackend::Sqlite("./strikefinder.db".into()),
            interval_ms: 1000,
            request_timeout: Duration::from_secs(30),
            resolver: ResolverConfig::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, DomainError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, DomainError> {
        let defaults = Config::default();

        let cache = match lookup("STRIKEFINDER_CACHE").as_deref().unwrap_or("sqlite") {
            "sqlite" => CacheBackend::Sqlite(lookup("STRIKEFINDER_DB").unwrap_or_else(|| "./strikefinder.db".into())),
            "csv" => CacheBackend::Csv(lookup("STRIKEFINDER_CSV_DIR").unwrap_or_else(|| "./hist_quotes".into())),
            other => {
                return Err(DomainError::Config(format!(
                    "STRIKEFINDER_CACHE must be 'sqlite' or 'csv', got '{other}'"
                )))
            }
        };

        let timeout_secs: u64 = parse_var(&lookup, "STRIKEFINDER_TIMEOUT_SECS", defaults.request_timeout.as_secs())?;
        let resolver = ResolverConfig {
            max_steps: parse_var(&lookup, "STRIKEFINDER_MAX_STEPS", defaults.resolver.max_steps)?,
            tolerance: parse_var(&lookup, "STRIKEFINDER_TOLERANCE", defaults.resolver.tolerance)?,
            pricing: PricingInputs {
                volatility: parse_var(&lookup, "STRIKEFINDER_VOLATILITY", defaults.resolver.pricing.volatility)?,
                risk_free_rate: parse_var(
                    &lookup,
                    "STRIKEFINDER_RISK_FREE_RATE",
                    defaults.resolver.pricing.risk_free_rate,
                )?,
            },
        };

        Ok(Self {
            base_url: lookup("STRIKEFINDER_BASE_URL").unwrap_or(defaults.base_url),
            cache,
            interval_ms: parse_var(&lookup, "STRIKEFINDER_INTERVAL_MS", defaults.interval_ms)?,
            request_timeout: Duration::from_secs(timeout_secs),
            resolver,
        })
    }
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T, DomainError> {
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| DomainError::Config(format!("{key} has invalid value '{raw}'"))),
    }
}
