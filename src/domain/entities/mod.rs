pub mod contract;
pub mod quote;
pub mod search_state;
pub mod strike_match;
