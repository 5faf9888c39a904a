pub mod app;
pub mod arbitrage_engine;
pub mod csv_export;
pub mod error;
pub mod filter_policy;
pub mod locations;
pub mod market_fetcher;
pub mod result_set;
pub mod shared_types;
