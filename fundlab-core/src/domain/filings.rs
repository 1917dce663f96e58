//! Insider trades and statement line items.
//!
//! Both schemas are modelled so callers can type against them, but the
//! current upstream source supplies neither: their access functions always
//! return an empty sequence.

use super::dataset::{Dataset, DatasetKind, DateOrder};
use super::metrics::Period;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One insider transaction from a Form 4 style filing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsiderTrade {
    pub ticker: String,
    pub issuer: Option<String>,
    pub name: Option<String>,
    pub title: Option<String>,
    pub is_board_director: Option<bool>,
    pub transaction_date: Option<NaiveDate>,
    pub transaction_shares: Option<f64>,
    pub transaction_price_per_share: Option<f64>,
    pub transaction_value: Option<f64>,
    pub shares_owned_before_transaction: Option<f64>,
    pub shares_owned_after_transaction: Option<f64>,
    pub security_title: Option<String>,
    pub filing_date: NaiveDate,
}

impl Dataset for InsiderTrade {
    const KIND: DatasetKind = DatasetKind::InsiderTrades;
    const ORDER: DateOrder = DateOrder::Descending;

    /// Transaction date when known, else the filing date.
    fn date(&self) -> NaiveDate {
        self.transaction_date.unwrap_or(self.filing_date)
    }

    fn identity(&self) -> String {
        format!(
            "{}/{}/{}",
            self.filing_date,
            self.name.as_deref().unwrap_or_default(),
            self.transaction_shares.unwrap_or_default()
        )
    }
}

/// Named statement values (revenue, free_cash_flow, ...) for one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub ticker: String,
    pub report_period: NaiveDate,
    pub period: Period,
    pub currency: String,
    #[serde(flatten)]
    pub values: BTreeMap<String, f64>,
}

impl Dataset for LineItem {
    const KIND: DatasetKind = DatasetKind::LineItems;
    const ORDER: DateOrder = DateOrder::Descending;

    fn date(&self) -> NaiveDate {
        self.report_period
    }

    fn identity(&self) -> String {
        format!("{}/{}", self.report_period, self.period)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsiderTradeResponse {
    pub insider_trades: Vec<InsiderTrade>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItemResponse {
    pub search_results: Vec<LineItem>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_item_values_flatten_into_record() {
        let raw = serde_json::json!({
            "ticker": "MSFT",
            "report_period": "2023-12-31",
            "period": "annual",
            "currency": "USD",
            "revenue": 211_915_000_000.0_f64,
            "free_cash_flow": 59_475_000_000.0_f64
        });
        let item: LineItem = serde_json::from_value(raw).unwrap();
        assert_eq!(item.values.len(), 2);
        assert_eq!(item.values["revenue"], 211_915_000_000.0);
    }

    #[test]
    fn insider_trade_date_falls_back_to_filing() {
        let filing_date = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        let trade = InsiderTrade {
            ticker: "AAPL".into(),
            issuer: None,
            name: Some("Jane Doe".into()),
            title: None,
            is_board_director: None,
            transaction_date: None,
            transaction_shares: Some(100.0),
            transaction_price_per_share: None,
            transaction_value: None,
            shares_owned_before_transaction: None,
            shares_owned_after_transaction: None,
            security_title: None,
            filing_date,
        };
        assert_eq!(trade.date(), filing_date);
    }
}
