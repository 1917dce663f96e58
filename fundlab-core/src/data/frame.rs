//! Tabular projection of price bars.

use crate::domain::Price;
use crate::error::DataError;
use chrono::{DateTime, Utc};
use polars::prelude::*;

/// Column order of a projected price table; `time` is the index.
pub const PRICE_COLUMNS: [&str; 6] = ["time", "open", "high", "low", "close", "volume"];

/// Project bars into a `DataFrame` indexed by `time` (dtype `Date`), rows in
/// ascending time order. No resampling or gap filling.
pub fn prices_to_frame(prices: &[Price]) -> Result<DataFrame, DataError> {
    let mut sorted: Vec<&Price> = prices.iter().collect();
    sorted.sort_by_key(|p| p.time);

    let epoch = DateTime::<Utc>::UNIX_EPOCH.date_naive();
    let days: Vec<i32> = sorted
        .iter()
        .map(|p| (p.time - epoch).num_days() as i32)
        .collect();
    let opens: Vec<f64> = sorted.iter().map(|p| p.open).collect();
    let highs: Vec<f64> = sorted.iter().map(|p| p.high).collect();
    let lows: Vec<f64> = sorted.iter().map(|p| p.low).collect();
    let closes: Vec<f64> = sorted.iter().map(|p| p.close).collect();
    let volumes: Vec<u64> = sorted.iter().map(|p| p.volume).collect();

    DataFrame::new(vec![
        Column::new("time".into(), days)
            .cast(&DataType::Date)
            .map_err(|e| DataError::Frame(format!("time cast: {e}")))?,
        Column::new("open".into(), opens),
        Column::new("high".into(), highs),
        Column::new("low".into(), lows),
        Column::new("close".into(), closes),
        Column::new("volume".into(), volumes),
    ])
    .map_err(|e| DataError::Frame(format!("dataframe creation: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn bar(day: u32, close: f64) -> Price {
        Price {
            time: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 500 + day as u64,
        }
    }

    #[test]
    fn empty_input_is_empty_table() {
        let df = prices_to_frame(&[]).unwrap();
        assert_eq!(df.height(), 0);
        assert_eq!(df.width(), PRICE_COLUMNS.len());
    }

    #[test]
    fn columns_and_dtypes() {
        let df = prices_to_frame(&[bar(2, 10.0)]).unwrap();
        let names: Vec<&str> = df.get_column_names().iter().map(|n| n.as_str()).collect();
        assert_eq!(names, PRICE_COLUMNS);
        assert_eq!(df.column("time").unwrap().dtype(), &DataType::Date);
        assert_eq!(df.column("close").unwrap().dtype(), &DataType::Float64);
        assert_eq!(df.column("volume").unwrap().dtype(), &DataType::UInt64);
    }

    #[test]
    fn rows_are_sorted_ascending() {
        let df = prices_to_frame(&[bar(5, 3.0), bar(2, 1.0), bar(3, 2.0)]).unwrap();
        let closes: Vec<Option<f64>> = df
            .column("close")
            .unwrap()
            .f64()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(closes, vec![Some(1.0), Some(2.0), Some(3.0)]);
    }
}
