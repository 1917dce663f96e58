//! Price: one daily OHLCV bar.

use super::dataset::{Dataset, DatasetKind, DateOrder};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Daily OHLCV bar. The ticker is implied by the cache key / request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Price {
    pub time: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl Price {
    /// Basic OHLC sanity: finite, positive, and high/low bracket open/close.
    pub fn is_sane(&self) -> bool {
        let fields = [self.open, self.high, self.low, self.close];
        if fields.iter().any(|v| !v.is_finite() || *v <= 0.0) {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
    }
}

impl Dataset for Price {
    const KIND: DatasetKind = DatasetKind::Prices;
    const ORDER: DateOrder = DateOrder::Ascending;

    fn date(&self) -> NaiveDate {
        self.time
    }

    fn identity(&self) -> String {
        self.time.to_string()
    }
}

/// JSON envelope for a ticker's price series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceResponse {
    pub ticker: String,
    pub prices: Vec<Price>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar() -> Price {
        Price {
            time: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            open: 187.15,
            high: 188.44,
            low: 183.89,
            close: 185.64,
            volume: 82_488_700,
        }
    }

    #[test]
    fn time_serializes_as_iso_date() {
        let json = serde_json::to_value(bar()).unwrap();
        assert_eq!(json["time"], "2024-01-02");
    }

    #[test]
    fn sanity_rejects_inverted_range() {
        assert!(bar().is_sane());
        let inverted = Price {
            high: 180.0,
            ..bar()
        };
        assert!(!inverted.is_sane());
    }
}
