//! Financial metrics snapshots.
//!
//! Every ratio is optional: the upstream source rarely supplies all of them,
//! and `None` means "unknown", never zero.

use super::dataset::{Dataset, DatasetKind, DateOrder};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Reporting period a metrics snapshot covers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    /// Trailing twelve months.
    #[default]
    Ttm,
    Annual,
    Quarterly,
}

impl Period {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ttm => "ttm",
            Self::Annual => "annual",
            Self::Quarterly => "quarterly",
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Period {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ttm" => Ok(Self::Ttm),
            "annual" => Ok(Self::Annual),
            "quarterly" => Ok(Self::Quarterly),
            other => Err(format!(
                "unknown period '{other}' (expected ttm, annual, or quarterly)"
            )),
        }
    }
}

/// Valuation, profitability, efficiency, liquidity, leverage, and growth
/// ratios for one ticker as of one reporting period.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FinancialMetrics {
    pub ticker: String,
    pub report_period: NaiveDate,
    pub period: Period,
    pub currency: String,

    // Valuation
    pub market_cap: Option<f64>,
    pub enterprise_value: Option<f64>,
    pub price_to_earnings_ratio: Option<f64>,
    pub price_to_book_ratio: Option<f64>,
    pub price_to_sales_ratio: Option<f64>,
    pub enterprise_value_to_ebitda_ratio: Option<f64>,
    pub enterprise_value_to_revenue_ratio: Option<f64>,
    pub free_cash_flow_yield: Option<f64>,
    pub peg_ratio: Option<f64>,

    // Profitability
    pub gross_margin: Option<f64>,
    pub operating_margin: Option<f64>,
    pub net_margin: Option<f64>,
    pub return_on_equity: Option<f64>,
    pub return_on_assets: Option<f64>,
    pub return_on_invested_capital: Option<f64>,

    // Efficiency
    pub asset_turnover: Option<f64>,
    pub inventory_turnover: Option<f64>,
    pub receivables_turnover: Option<f64>,
    pub days_sales_outstanding: Option<f64>,
    pub operating_cycle: Option<f64>,
    pub working_capital_turnover: Option<f64>,

    // Liquidity
    pub current_ratio: Option<f64>,
    pub quick_ratio: Option<f64>,
    pub cash_ratio: Option<f64>,
    pub operating_cash_flow_ratio: Option<f64>,

    // Leverage
    pub debt_to_equity: Option<f64>,
    pub debt_to_assets: Option<f64>,
    pub interest_coverage: Option<f64>,

    // Growth
    pub revenue_growth: Option<f64>,
    pub earnings_growth: Option<f64>,
    pub book_value_growth: Option<f64>,
    pub earnings_per_share_growth: Option<f64>,
    pub free_cash_flow_growth: Option<f64>,
    pub operating_income_growth: Option<f64>,
    pub ebitda_growth: Option<f64>,

    // Per share
    pub payout_ratio: Option<f64>,
    pub earnings_per_share: Option<f64>,
    pub book_value_per_share: Option<f64>,
    pub free_cash_flow_per_share: Option<f64>,
}

impl FinancialMetrics {
    /// Empty snapshot: every ratio unknown.
    pub fn new(
        ticker: impl Into<String>,
        report_period: NaiveDate,
        period: Period,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            ticker: ticker.into(),
            report_period,
            period,
            currency: currency.into(),
            ..Self::default()
        }
    }
}

impl Dataset for FinancialMetrics {
    const KIND: DatasetKind = DatasetKind::FinancialMetrics;
    const ORDER: DateOrder = DateOrder::Descending;

    fn date(&self) -> NaiveDate {
        self.report_period
    }

    fn identity(&self) -> String {
        format!("{}/{}", self.report_period, self.period)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialMetricsResponse {
    pub financial_metrics: Vec<FinancialMetrics>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_ratios_deserialize_as_unknown() {
        let raw = serde_json::json!({
            "ticker": "AAPL",
            "report_period": "2024-03-31",
            "period": "ttm",
            "currency": "USD",
            "market_cap": 2.6e12
        });
        let metrics: FinancialMetrics = serde_json::from_value(raw).unwrap();
        assert_eq!(metrics.market_cap, Some(2.6e12));
        assert_eq!(metrics.peg_ratio, None);
        assert_eq!(metrics.period, Period::Ttm);
    }

    #[test]
    fn identity_includes_period() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 31).unwrap();
        let ttm = FinancialMetrics::new("AAPL", date, Period::Ttm, "USD");
        let quarterly = FinancialMetrics::new("AAPL", date, Period::Quarterly, "USD");
        assert_ne!(ttm.identity(), quarterly.identity());
    }

    #[test]
    fn period_round_trips_through_str() {
        for period in [Period::Ttm, Period::Annual, Period::Quarterly] {
            assert_eq!(period.as_str().parse::<Period>().unwrap(), period);
        }
        assert!("monthly".parse::<Period>().is_err());
    }
}
