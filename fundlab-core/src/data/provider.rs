//! Upstream fetcher trait and structured fetch errors.
//!
//! The DataProvider trait abstracts over the external data source (Yahoo
//! Finance today) so the access layer can be driven by a scripted provider in
//! tests. Providers don't know about the cache; the access layer sits above.

use crate::domain::{
    CompanyFacts, CompanyNews, FinancialMetrics, InsiderTrade, LineItem, Period, Price,
};
use chrono::NaiveDate;
use thiserror::Error;

/// Why a single upstream call failed.
///
/// Carried as the `cause` of [`crate::DataError::UpstreamFetch`], which adds
/// the ticker.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("authentication required: {0}")]
    AuthenticationRequired(String),

    #[error("provider returned HTTP {status}")]
    HttpStatus { status: u16 },

    #[error("hard stop: data provider has blocked requests (circuit breaker tripped)")]
    CircuitBreakerTripped,

    #[error("fetch error: {0}")]
    Other(String),
}

/// One fetch function per dataset kind.
///
/// Contract shared by all methods:
/// - `Ok(vec![])` when the provider simply has no data for the entity.
/// - `Err(FetchError)` when the call itself failed or the payload could not be
///   mapped; never a partially corrupted result.
pub trait DataProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Daily bars with `start <= time <= end`.
    fn fetch_prices(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Price>, FetchError>;

    /// Snapshot of metrics as of `end_date` for the given period.
    fn fetch_financial_metrics(
        &self,
        ticker: &str,
        end_date: NaiveDate,
        period: Period,
    ) -> Result<Vec<FinancialMetrics>, FetchError>;

    /// News published within `[start, end]` (open start when `None`), at most `limit` items.
    fn fetch_company_news(
        &self,
        ticker: &str,
        start: Option<NaiveDate>,
        end: NaiveDate,
        limit: usize,
    ) -> Result<Vec<CompanyNews>, FetchError>;

    /// Not offered by the default provider; a known capability gap.
    fn fetch_insider_trades(
        &self,
        _ticker: &str,
        _start: Option<NaiveDate>,
        _end: NaiveDate,
        _limit: usize,
    ) -> Result<Vec<InsiderTrade>, FetchError> {
        Ok(Vec::new())
    }

    /// Not offered by the default provider; a known capability gap.
    fn fetch_line_items(
        &self,
        _ticker: &str,
        _line_items: &[String],
        _end_date: NaiveDate,
        _period: Period,
        _limit: usize,
    ) -> Result<Vec<LineItem>, FetchError> {
        Ok(Vec::new())
    }

    /// Descriptive profile of the issuer.
    fn fetch_company_facts(&self, ticker: &str) -> Result<CompanyFacts, FetchError>;

    /// Market capitalisation, `None` when the provider does not report one.
    fn fetch_market_cap(&self, ticker: &str, end_date: NaiveDate)
        -> Result<Option<f64>, FetchError>;

    /// Check if the provider is currently available (not blocked by its breaker).
    fn is_available(&self) -> bool;
}
