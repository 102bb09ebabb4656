pub mod black_scholes;
pub mod date_range;
pub mod right;
pub mod strike;
pub mod venue_time;
