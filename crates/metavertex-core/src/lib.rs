pub mod analytics;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod export;
pub mod filter;
pub mod market;
pub mod model;

pub use error::{MarketError, MarketResult};
pub use market::Marketplace;
