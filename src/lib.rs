pub mod aggregator;
pub mod config;
pub mod constants;
pub mod error;
pub mod export;
pub mod fixed_point;
pub mod scoring;
pub mod seigniorage;
pub mod service;
pub mod sources;
pub mod summary;
pub mod types;
pub mod utils;
