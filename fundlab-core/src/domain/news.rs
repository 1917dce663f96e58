use super::dataset::{Dataset, DatasetKind, DateOrder};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A single news item about a company.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyNews {
    pub ticker: String,
    pub title: String,
    pub author: String,
    pub source: String,
    pub date: NaiveDate,
    pub url: String,
    pub sentiment: Option<String>,
}

impl Dataset for CompanyNews {
    const KIND: DatasetKind = DatasetKind::CompanyNews;
    const ORDER: DateOrder = DateOrder::Descending;

    fn date(&self) -> NaiveDate {
        self.date
    }

    fn identity(&self) -> String {
        self.url.clone()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyNewsResponse {
    pub news: Vec<CompanyNews>,
}
