pub mod greeks_source;
pub mod quote_store;
