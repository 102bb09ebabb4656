pub mod delta_strike;
pub mod market_data;
pub mod quote_cache;
