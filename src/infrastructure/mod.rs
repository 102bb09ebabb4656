pub mod files;
pub mod sqlite;
pub mod thetadata;
