//! Access-layer error type.

use crate::data::provider::FetchError;
use crate::domain::DatasetKind;
use thiserror::Error;

/// Errors surfaced by the data access functions and the cache store.
///
/// "No data" is never an error: an empty sequence is returned instead. An
/// `UpstreamFetch` error means the answer could not be determined.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("upstream fetch failed for '{ticker}': {cause}")]
    UpstreamFetch {
        ticker: String,
        #[source]
        cause: FetchError,
    },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("cached {kind} record for '{ticker}' is malformed: {reason}")]
    CorruptCacheEntry {
        kind: DatasetKind,
        ticker: String,
        reason: String,
    },

    #[error("cache error: {0}")]
    CacheError(String),

    #[error("frame error: {0}")]
    Frame(String),
}

impl DataError {
    pub fn upstream(ticker: impl Into<String>, cause: FetchError) -> Self {
        Self::UpstreamFetch {
            ticker: ticker.into(),
            cause,
        }
    }

    /// Ticker an upstream failure refers to, if this is one.
    pub fn ticker(&self) -> Option<&str> {
        match self {
            Self::UpstreamFetch { ticker, .. } | Self::CorruptCacheEntry { ticker, .. } => {
                Some(ticker)
            }
            _ => None,
        }
    }
}
