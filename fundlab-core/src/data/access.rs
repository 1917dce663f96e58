//! Cache-aside data access functions.
//!
//! Every dataset goes through the same decision procedure:
//!
//! 1. look up the cache entry for `(kind, ticker)`
//! 2. on a hit, filter to the requested window, sort, apply `limit`
//! 3. a non-empty result is returned without touching the provider
//! 4. otherwise fetch the full requested window upstream, failing fast when
//!    the provider reports itself unavailable
//! 5. write a non-empty fetch back to the cache
//! 6. return the fetched records, normalized the same way as a hit
//!
//! Upstream errors are never turned into an empty result. The exceptions are
//! market cap (never cached, `None` on failure) and company facts (never
//! cached, errors propagate).

use super::cache::{CacheStore, WritePolicy};
use super::frame::prices_to_frame;
use super::provider::{DataProvider, FetchError};
use super::window::{normalize, DateWindow};
use crate::config::CacheConfig;
use crate::domain::{
    normalize_ticker, CompanyFactsResponse, CompanyNews, Dataset, FinancialMetrics, InsiderTrade,
    LineItem, Period, Price, Ticker,
};
use crate::error::DataError;
use chrono::NaiveDate;
use polars::prelude::DataFrame;
use std::sync::Arc;

/// Metrics snapshots returned when the caller gives no limit.
pub const DEFAULT_METRICS_LIMIT: usize = 10;
/// News items returned when the caller gives no limit.
pub const DEFAULT_NEWS_LIMIT: usize = 1000;
/// Insider trades returned when the caller gives no limit.
pub const DEFAULT_INSIDER_LIMIT: usize = 1000;
/// Line-item periods returned when the caller gives no limit.
pub const DEFAULT_LINE_ITEM_LIMIT: usize = 10;

/// Cache write and post-fetch behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessPolicy {
    pub write_policy: WritePolicy,
    /// Filter, sort and limit freshly fetched records like a cache hit.
    pub normalize_fetched: bool,
}

impl Default for AccessPolicy {
    fn default() -> Self {
        Self {
            write_policy: WritePolicy::Replace,
            normalize_fetched: true,
        }
    }
}

impl From<&CacheConfig> for AccessPolicy {
    fn from(config: &CacheConfig) -> Self {
        Self {
            write_policy: config.write_policy,
            normalize_fetched: config.normalize_fetched,
        }
    }
}

/// One query against a cached dataset.
struct Query<'a, T> {
    ticker: &'a str,
    window: DateWindow,
    limit: Option<usize>,
    /// Extra predicate a cached record must satisfy (e.g. matching period).
    accept: &'a dyn Fn(&T) -> bool,
}

/// The public access surface. Cheap to clone; clones share the provider and
/// the cache.
#[derive(Clone)]
pub struct DataAccess {
    provider: Arc<dyn DataProvider>,
    cache: Arc<CacheStore>,
    policy: AccessPolicy,
}

impl DataAccess {
    pub fn new(provider: Arc<dyn DataProvider>, cache: Arc<CacheStore>) -> Self {
        Self {
            provider,
            cache,
            policy: AccessPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: AccessPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn cache(&self) -> &Arc<CacheStore> {
        &self.cache
    }

    pub fn provider(&self) -> &dyn DataProvider {
        self.provider.as_ref()
    }

    pub fn policy(&self) -> AccessPolicy {
        self.policy
    }

    /// Daily bars with `start_date <= time <= end_date`, ascending.
    pub fn get_prices(
        &self,
        ticker: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<Price>, DataError> {
        let ticker = validate_ticker(ticker)?;
        let window = DateWindow::new(Some(start_date), end_date)?;
        self.cache_aside(
            Query {
                ticker: &ticker,
                window,
                limit: None,
                accept: &|_: &Price| true,
            },
            |provider, t| provider.fetch_prices(t, start_date, end_date),
        )
    }

    /// Metrics snapshots for `period` reported on or before `end_date`, most
    /// recent first. `limit` defaults to [`DEFAULT_METRICS_LIMIT`].
    pub fn get_financial_metrics(
        &self,
        ticker: &str,
        end_date: NaiveDate,
        period: Period,
        limit: Option<usize>,
    ) -> Result<Vec<FinancialMetrics>, DataError> {
        let ticker = validate_ticker(ticker)?;
        let limit = validate_limit(limit, DEFAULT_METRICS_LIMIT)?;
        self.cache_aside(
            Query {
                ticker: &ticker,
                window: DateWindow::until(end_date),
                limit: Some(limit),
                accept: &|m: &FinancialMetrics| m.period == period,
            },
            |provider, t| provider.fetch_financial_metrics(t, end_date, period),
        )
    }

    /// News dated within `[start_date, end_date]`, most recent first.
    /// `limit` defaults to [`DEFAULT_NEWS_LIMIT`].
    pub fn get_company_news(
        &self,
        ticker: &str,
        end_date: NaiveDate,
        start_date: Option<NaiveDate>,
        limit: Option<usize>,
    ) -> Result<Vec<CompanyNews>, DataError> {
        let ticker = validate_ticker(ticker)?;
        let limit = validate_limit(limit, DEFAULT_NEWS_LIMIT)?;
        let window = DateWindow::new(start_date, end_date)?;
        self.cache_aside(
            Query {
                ticker: &ticker,
                window,
                limit: Some(limit),
                accept: &|_: &CompanyNews| true,
            },
            |provider, t| provider.fetch_company_news(t, start_date, end_date, limit),
        )
    }

    /// Insider trades within the window, most recent first. The Yahoo provider
    /// has no insider data, so this is empty unless another provider supplies it.
    pub fn get_insider_trades(
        &self,
        ticker: &str,
        end_date: NaiveDate,
        start_date: Option<NaiveDate>,
        limit: Option<usize>,
    ) -> Result<Vec<InsiderTrade>, DataError> {
        let ticker = validate_ticker(ticker)?;
        let limit = validate_limit(limit, DEFAULT_INSIDER_LIMIT)?;
        let window = DateWindow::new(start_date, end_date)?;
        self.cache_aside(
            Query {
                ticker: &ticker,
                window,
                limit: Some(limit),
                accept: &|_: &InsiderTrade| true,
            },
            |provider, t| provider.fetch_insider_trades(t, start_date, end_date, limit),
        )
    }

    /// Statement line items for `period` up to `end_date`, most recent first.
    /// Each item carries only the requested names it actually reports; a name
    /// missing from one period does not drop the period. Empty with the Yahoo
    /// provider.
    pub fn search_line_items(
        &self,
        ticker: &str,
        line_items: &[String],
        end_date: NaiveDate,
        period: Period,
        limit: Option<usize>,
    ) -> Result<Vec<LineItem>, DataError> {
        let ticker = validate_ticker(ticker)?;
        let limit = validate_limit(limit, DEFAULT_LINE_ITEM_LIMIT)?;
        let mut items = self.cache_aside(
            Query {
                ticker: &ticker,
                window: DateWindow::until(end_date),
                limit: Some(limit),
                accept: &|item: &LineItem| item.period == period,
            },
            |provider, t| provider.fetch_line_items(t, line_items, end_date, period, limit),
        )?;
        if !line_items.is_empty() {
            for item in &mut items {
                item.values.retain(|name, _| line_items.contains(name));
            }
        }
        Ok(items)
    }

    /// Live profile lookup. Not cached; failures propagate.
    pub fn get_company_facts(&self, ticker: &str) -> Result<CompanyFactsResponse, DataError> {
        let ticker = validate_ticker(ticker)?;
        if !self.provider.is_available() {
            return Err(DataError::upstream(&ticker, FetchError::CircuitBreakerTripped));
        }
        tracing::debug!(ticker = %ticker, "fetching company facts");
        let company_facts = self
            .provider
            .fetch_company_facts(&ticker)
            .map_err(|cause| DataError::upstream(&ticker, cause))?;
        Ok(CompanyFactsResponse { company_facts })
    }

    /// Live market-cap lookup. Not cached; any failure is logged and yields
    /// `None`.
    pub fn get_market_cap(&self, ticker: &str, end_date: NaiveDate) -> Option<f64> {
        let ticker = match validate_ticker(ticker) {
            Ok(t) => t,
            Err(e) => {
                tracing::warn!(error = %e, "market cap lookup rejected");
                return None;
            }
        };
        if !self.provider.is_available() {
            tracing::warn!(ticker = %ticker, "market cap skipped: provider unavailable");
            return None;
        }
        match self.provider.fetch_market_cap(&ticker, end_date) {
            Ok(cap) => cap,
            Err(cause) => {
                tracing::warn!(ticker = %ticker, error = %cause, "market cap lookup failed");
                None
            }
        }
    }

    /// [`DataAccess::get_prices`] projected into a time-indexed table.
    pub fn get_price_data(
        &self,
        ticker: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<DataFrame, DataError> {
        let prices = self.get_prices(ticker, start_date, end_date)?;
        prices_to_frame(&prices)
    }

    fn cache_aside<T, F>(&self, query: Query<'_, T>, fetch: F) -> Result<Vec<T>, DataError>
    where
        T: Dataset,
        F: FnOnce(&dyn DataProvider, &str) -> Result<Vec<T>, FetchError>,
    {
        let Query {
            ticker,
            window,
            limit,
            accept,
        } = query;
        let kind = T::KIND;

        if let Some(cached) = self.cache.read_records::<T>(ticker)? {
            let cached_len = cached.len();
            let hits = normalize(
                cached.into_iter().filter(|r| accept(r)).collect(),
                &window,
                limit,
            );
            if !hits.is_empty() {
                tracing::debug!(ticker, %kind, records = hits.len(), "cache hit");
                return Ok(hits);
            }
            tracing::debug!(
                ticker,
                %kind,
                cached = cached_len,
                "cached entry has nothing in range"
            );
        } else {
            tracing::debug!(ticker, %kind, "cache miss");
        }

        if !self.provider.is_available() {
            tracing::warn!(ticker, %kind, provider = self.provider.name(), "provider unavailable");
            return Err(DataError::upstream(ticker, FetchError::CircuitBreakerTripped));
        }

        let fetched = fetch(self.provider.as_ref(), ticker)
            .map_err(|cause| DataError::upstream(ticker, cause))?;

        if fetched.is_empty() {
            tracing::info!(ticker, %kind, provider = self.provider.name(), "no data upstream");
            return Ok(fetched);
        }

        let stored = self
            .cache
            .put_records(ticker, &fetched, self.policy.write_policy)?;
        tracing::info!(
            ticker,
            %kind,
            fetched = fetched.len(),
            stored,
            "fetched and cached"
        );

        if !self.policy.normalize_fetched {
            return Ok(fetched);
        }
        Ok(normalize(
            fetched.into_iter().filter(|r| accept(r)).collect(),
            &window,
            limit,
        ))
    }
}

fn validate_ticker(ticker: &str) -> Result<Ticker, DataError> {
    let ticker = normalize_ticker(ticker);
    if ticker.is_empty() {
        return Err(DataError::InvalidRequest("ticker must not be empty".into()));
    }
    Ok(ticker)
}

fn validate_limit(limit: Option<usize>, default: usize) -> Result<usize, DataError> {
    match limit {
        Some(0) => Err(DataError::InvalidRequest(
            "limit must be a positive integer".into(),
        )),
        Some(n) => Ok(n),
        None => Ok(default),
    }
}
