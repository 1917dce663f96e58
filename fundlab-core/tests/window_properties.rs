//! Property tests for window filtering and limit truncation.
//!
//! Uses proptest to verify:
//! 1. Filtering by `[a, b]` is idempotent
//! 2. Filtered records all fall inside the window, and none inside are lost
//! 3. `limit = N` returns at most N records: the N most recent for
//!    descending datasets, the N earliest for prices

use chrono::{Duration, NaiveDate};
use fundlab_core::data::{filter_window, normalize, DateWindow};
use fundlab_core::domain::{CompanyNews, Price};
use proptest::prelude::*;

// ── Strategies (proptest) ────────────────────────────────────────────

fn base() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()
}

fn arb_date() -> impl Strategy<Value = NaiveDate> {
    (0..1500i64).prop_map(|d| base() + Duration::days(d))
}

fn arb_window() -> impl Strategy<Value = DateWindow> {
    (proptest::option::of(0..1500i64), 0..1500i64).prop_map(|(a, b)| {
        let end = base() + Duration::days(b);
        let start = a.map(|a| base() + Duration::days(a.min(b)));
        DateWindow::new(start, end).unwrap()
    })
}

fn arb_prices() -> impl Strategy<Value = Vec<Price>> {
    proptest::collection::vec(arb_date(), 0..60).prop_map(|dates| {
        dates
            .into_iter()
            .map(|time| Price {
                time,
                open: 10.0,
                high: 11.0,
                low: 9.0,
                close: 10.5,
                volume: 100,
            })
            .collect()
    })
}

fn arb_news() -> impl Strategy<Value = Vec<CompanyNews>> {
    proptest::collection::vec(arb_date(), 0..60).prop_map(|dates| {
        dates
            .into_iter()
            .enumerate()
            .map(|(i, date)| CompanyNews {
                ticker: "AAPL".into(),
                title: format!("item {i}"),
                author: "Reuters".into(),
                source: "Reuters".into(),
                date,
                url: format!("https://news.example/{i}"),
                sentiment: None,
            })
            .collect()
    })
}

// ── 1-2. Filtering ───────────────────────────────────────────────────

proptest! {
    #[test]
    fn filter_is_idempotent(prices in arb_prices(), window in arb_window()) {
        let once = filter_window(prices, &window);
        let twice = filter_window(once.clone(), &window);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn filter_keeps_exactly_the_window(news in arb_news(), window in arb_window()) {
        let inside = news.iter().filter(|n| window.contains(n.date)).count();
        let kept = filter_window(news, &window);
        prop_assert_eq!(kept.len(), inside);
        for n in &kept {
            prop_assert!(n.date <= window.end);
            if let Some(start) = window.start {
                prop_assert!(n.date >= start);
            }
        }
    }
}

// ── 3. Limit ─────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn news_limit_keeps_most_recent(
        news in arb_news(),
        window in arb_window(),
        limit in 1usize..20,
    ) {
        let mut expected: Vec<NaiveDate> = news
            .iter()
            .map(|n| n.date)
            .filter(|d| window.contains(*d))
            .collect();
        expected.sort_by(|a, b| b.cmp(a));
        expected.truncate(limit);

        let out = normalize(news, &window, Some(limit));
        prop_assert!(out.len() <= limit);
        let dates: Vec<NaiveDate> = out.iter().map(|n| n.date).collect();
        prop_assert_eq!(dates, expected);
    }

    #[test]
    fn price_limit_keeps_earliest(
        prices in arb_prices(),
        window in arb_window(),
        limit in 1usize..20,
    ) {
        let mut expected: Vec<NaiveDate> = prices
            .iter()
            .map(|p| p.time)
            .filter(|d| window.contains(*d))
            .collect();
        expected.sort();
        expected.truncate(limit);

        let out = normalize(prices, &window, Some(limit));
        prop_assert!(out.len() <= limit);
        let dates: Vec<NaiveDate> = out.iter().map(|p| p.time).collect();
        prop_assert_eq!(dates, expected);
    }

    #[test]
    fn normalize_is_idempotent(news in arb_news(), window in arb_window()) {
        let once = normalize(news, &window, None);
        let twice = normalize(once.clone(), &window, None);
        prop_assert_eq!(once, twice);
    }
}
