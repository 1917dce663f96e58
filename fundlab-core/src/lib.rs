//! FundLab Core: cache-aside access to financial time series.
//!
//! This crate contains:
//! - Record models (prices, financial metrics, news, insider trades, line
//!   items, company facts)
//! - An injectable in-process cache store with optional JSON snapshots
//! - The upstream provider trait and a Yahoo Finance implementation
//! - The data access functions that decide between cache and provider
//! - A polars projection of price bars

pub mod config;
pub mod data;
pub mod domain;
pub mod error;

pub use config::{ConfigError, FundlabConfig};
pub use data::{AccessPolicy, CacheStore, DataAccess, DataProvider, FetchError, YahooProvider};
pub use error::DataError;
