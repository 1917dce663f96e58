//! Dataset kinds and the trait that ties a record model to its cache slot.

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The kinds of dataset the access layer knows about.
///
/// Together with a ticker this forms the cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetKind {
    Prices,
    FinancialMetrics,
    CompanyNews,
    InsiderTrades,
    LineItems,
    CompanyFacts,
}

impl DatasetKind {
    pub const ALL: [DatasetKind; 6] = [
        DatasetKind::Prices,
        DatasetKind::FinancialMetrics,
        DatasetKind::CompanyNews,
        DatasetKind::InsiderTrades,
        DatasetKind::LineItems,
        DatasetKind::CompanyFacts,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Prices => "prices",
            Self::FinancialMetrics => "financial_metrics",
            Self::CompanyNews => "company_news",
            Self::InsiderTrades => "insider_trades",
            Self::LineItems => "line_items",
            Self::CompanyFacts => "company_facts",
        }
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DatasetKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| format!("unknown dataset kind '{s}'"))
    }
}

/// Direction a dataset is returned in after normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateOrder {
    /// Oldest first. Continuous series (price bars).
    Ascending,
    /// Most recent first. Point-in-time snapshots (metrics, news).
    Descending,
}

/// A record model that can be stored in the cache and filtered by date.
pub trait Dataset: Serialize + DeserializeOwned + Clone {
    /// Cache slot this model lives in.
    const KIND: DatasetKind;

    /// Order of a normalized result; also decides which end `limit` keeps.
    const ORDER: DateOrder;

    /// The record's natural date, used for window filtering and sorting.
    fn date(&self) -> NaiveDate;

    /// Identity of the record within a single ticker's sequence.
    fn identity(&self) -> String;
}
