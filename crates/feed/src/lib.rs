//! Paginated client for the EIA nuclear outage feed.

pub mod client;
pub mod config;
pub mod fetcher;
pub mod health;
pub mod page;

pub use client::*;
pub use config::*;
pub use fetcher::*;
pub use page::*;
