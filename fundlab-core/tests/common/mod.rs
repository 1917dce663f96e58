//! Shared fixtures: a scripted in-memory provider that counts calls.
#![allow(dead_code)]

use chrono::{Datelike, NaiveDate, Weekday};
use fundlab_core::data::{DataProvider, FetchError};
use fundlab_core::domain::{
    CompanyFacts, CompanyNews, FinancialMetrics, LineItem, Period, Price,
};
use std::sync::atomic::{AtomicUsize, Ordering};

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn bar(time: NaiveDate, close: f64) -> Price {
    Price {
        time,
        open: close - 0.5,
        high: close + 1.0,
        low: close - 1.0,
        close,
        volume: 1_000_000,
    }
}

/// 21 synthetic weekday bars, 2024-01-02 through 2024-01-30.
pub fn january_bars() -> Vec<Price> {
    let mut bars = Vec::new();
    let mut day = date(2024, 1, 2);
    while bars.len() < 21 {
        if !matches!(day.weekday(), Weekday::Sat | Weekday::Sun) {
            bars.push(bar(day, 180.0 + bars.len() as f64));
        }
        day = day.succ_opt().unwrap();
    }
    bars
}

pub fn news_item(ticker: &str, date: NaiveDate, n: usize) -> CompanyNews {
    CompanyNews {
        ticker: ticker.to_string(),
        title: format!("headline {n}"),
        author: "Reuters".into(),
        source: "Reuters".into(),
        date,
        url: format!("https://news.example/{ticker}/{n}"),
        sentiment: None,
    }
}

/// Provider that serves fixed data, filtered to the requested window the way
/// a real upstream would, or fails every call with `fail_with`. With
/// `unavailable` set it reports itself blocked, like a tripped breaker.
#[derive(Default)]
pub struct ScriptedProvider {
    pub prices: Vec<Price>,
    pub metrics: Vec<FinancialMetrics>,
    pub news: Vec<CompanyNews>,
    pub line_items: Vec<LineItem>,
    pub facts: Option<CompanyFacts>,
    pub market_cap: Option<f64>,
    pub fail_with: Option<FetchError>,
    pub unavailable: bool,
    pub calls: AtomicUsize,
}

impl ScriptedProvider {
    pub fn failing(err: FetchError) -> Self {
        Self {
            fail_with: Some(err),
            ..Self::default()
        }
    }

    /// Number of fetch calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn enter(&self) -> Result<(), FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.fail_with {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

impl DataProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn fetch_prices(
        &self,
        _ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Price>, FetchError> {
        self.enter()?;
        Ok(self
            .prices
            .iter()
            .filter(|p| p.time >= start && p.time <= end)
            .cloned()
            .collect())
    }

    fn fetch_financial_metrics(
        &self,
        _ticker: &str,
        end_date: NaiveDate,
        period: Period,
    ) -> Result<Vec<FinancialMetrics>, FetchError> {
        self.enter()?;
        Ok(self
            .metrics
            .iter()
            .filter(|m| m.report_period <= end_date && m.period == period)
            .cloned()
            .collect())
    }

    fn fetch_company_news(
        &self,
        _ticker: &str,
        start: Option<NaiveDate>,
        end: NaiveDate,
        limit: usize,
    ) -> Result<Vec<CompanyNews>, FetchError> {
        self.enter()?;
        Ok(self
            .news
            .iter()
            .filter(|n| start.map_or(true, |s| n.date >= s) && n.date <= end)
            .take(limit)
            .cloned()
            .collect())
    }

    fn fetch_line_items(
        &self,
        _ticker: &str,
        _line_items: &[String],
        end_date: NaiveDate,
        period: Period,
        limit: usize,
    ) -> Result<Vec<LineItem>, FetchError> {
        self.enter()?;
        Ok(self
            .line_items
            .iter()
            .filter(|item| item.report_period <= end_date && item.period == period)
            .take(limit)
            .cloned()
            .collect())
    }

    fn fetch_company_facts(&self, ticker: &str) -> Result<CompanyFacts, FetchError> {
        self.enter()?;
        self.facts.clone().ok_or_else(|| FetchError::SymbolNotFound {
            symbol: ticker.to_string(),
        })
    }

    fn fetch_market_cap(
        &self,
        _ticker: &str,
        _end_date: NaiveDate,
    ) -> Result<Option<f64>, FetchError> {
        self.enter()?;
        Ok(self.market_cap)
    }

    fn is_available(&self) -> bool {
        !self.unavailable
    }
}
