pub mod migrations;
pub mod quote_store;
