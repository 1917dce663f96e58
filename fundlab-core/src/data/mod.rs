//! Data access: cache store, upstream providers, and the cache-aside layer.
//!
//! Layering: `DataAccess` → `CacheStore` (read) → `DataProvider` (on miss) →
//! `CacheStore` (write) → caller. `frame` sits downstream of prices only.

pub mod access;
pub mod cache;
pub mod circuit_breaker;
pub mod frame;
pub mod provider;
pub mod window;
pub mod yahoo;

pub use access::{
    AccessPolicy, DataAccess, DEFAULT_INSIDER_LIMIT, DEFAULT_LINE_ITEM_LIMIT,
    DEFAULT_METRICS_LIMIT, DEFAULT_NEWS_LIMIT,
};
pub use cache::{CacheEntry, CacheStatus, CacheStore, RawRecord, SnapshotMeta, WritePolicy};
pub use circuit_breaker::{BreakerState, CircuitBreaker};
pub use frame::{prices_to_frame, PRICE_COLUMNS};
pub use provider::{DataProvider, FetchError};
pub use window::{filter_window, normalize, parse_date, DateWindow};
pub use yahoo::YahooProvider;
