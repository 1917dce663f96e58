//! Record models for every dataset the access layer serves.

pub mod dataset;
pub mod facts;
pub mod filings;
pub mod metrics;
pub mod news;
pub mod price;

pub use dataset::{Dataset, DatasetKind, DateOrder};
pub use facts::{CompanyFacts, CompanyFactsResponse};
pub use filings::{InsiderTrade, InsiderTradeResponse, LineItem, LineItemResponse};
pub use metrics::{FinancialMetrics, FinancialMetricsResponse, Period};
pub use news::{CompanyNews, CompanyNewsResponse};
pub use price::{Price, PriceResponse};

/// Ticker type alias
pub type Ticker = String;

/// Canonical cache/request form of a ticker: trimmed, upper-cased.
pub fn normalize_ticker(ticker: &str) -> Ticker {
    ticker.trim().to_ascii_uppercase()
}
