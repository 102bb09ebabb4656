pub mod csv_quote_store;
