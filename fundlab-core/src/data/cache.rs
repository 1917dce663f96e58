//! In-process cache store keyed by `(dataset kind, ticker)`.
//!
//! Entries hold raw records (JSON objects), not typed models, so the store
//! stays schema-agnostic. The typed helpers [`CacheStore::read_records`] and
//! [`CacheStore::put_records`] are the only (de)serialization boundary.
//!
//! Features:
//! - Full replacement on write (default) or merge-by-identity
//! - Per-entry status (kind, ticker, record count, write time)
//! - JSON snapshot with a BLAKE3 metadata sidecar
//! - Atomic snapshot writes (write to .tmp, rename into place)
//! - Quarantine for snapshots whose hash does not match their sidecar

use crate::domain::{normalize_ticker, Dataset, DatasetKind};
use crate::error::DataError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// A record as stored in the cache: a plain field mapping.
pub type RawRecord = Map<String, Value>;

/// How a fresh fetch is written over an existing entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WritePolicy {
    /// The fetched sequence replaces the entry wholesale.
    #[default]
    Replace,
    /// Union of old and new records by identity; new records win, result is
    /// ordered by date ascending.
    MergeByKey,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
struct CacheKey {
    kind: DatasetKind,
    ticker: String,
}

/// One cached sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub kind: DatasetKind,
    pub ticker: String,
    pub records: Vec<RawRecord>,
    pub written_at: DateTime<Utc>,
}

/// Cache status for a single entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheStatus {
    pub kind: DatasetKind,
    pub ticker: String,
    pub record_count: usize,
    pub written_at: DateTime<Utc>,
}

/// Metadata sidecar written next to a snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotMeta {
    pub entry_count: usize,
    pub record_count: usize,
    pub data_hash: String,
    pub saved_at: DateTime<Utc>,
}

/// The cache store. Construct one and share it by `Arc`.
#[derive(Debug, Default)]
pub struct CacheStore {
    entries: RwLock<BTreeMap<CacheKey, CacheEntry>>,
}

impl CacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(kind: DatasetKind, ticker: &str) -> CacheKey {
        CacheKey {
            kind,
            ticker: normalize_ticker(ticker),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<CacheKey, CacheEntry>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<CacheKey, CacheEntry>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Raw records cached for `(kind, ticker)`, if any.
    pub fn get(&self, kind: DatasetKind, ticker: &str) -> Option<Vec<RawRecord>> {
        self.read()
            .get(&Self::key(kind, ticker))
            .map(|entry| entry.records.clone())
    }

    /// Replace the entry for `(kind, ticker)` with `records`.
    pub fn set(&self, kind: DatasetKind, ticker: &str, records: Vec<RawRecord>) {
        let key = Self::key(kind, ticker);
        let entry = CacheEntry {
            kind,
            ticker: key.ticker.clone(),
            records,
            written_at: Utc::now(),
        };
        self.write().insert(key, entry);
    }

    pub fn remove(&self, kind: DatasetKind, ticker: &str) -> bool {
        self.write().remove(&Self::key(kind, ticker)).is_some()
    }

    /// Drop every kind cached for `ticker`. Returns the number of entries removed.
    pub fn remove_ticker(&self, ticker: &str) -> usize {
        let ticker = normalize_ticker(ticker);
        let mut entries = self.write();
        let before = entries.len();
        entries.retain(|key, _| key.ticker != ticker);
        before - entries.len()
    }

    pub fn clear(&self) {
        self.write().clear();
    }

    /// Number of cached entries (not records).
    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Status of every entry, ordered by kind then ticker.
    pub fn status(&self) -> Vec<CacheStatus> {
        self.read()
            .values()
            .map(|entry| CacheStatus {
                kind: entry.kind,
                ticker: entry.ticker.clone(),
                record_count: entry.records.len(),
                written_at: entry.written_at,
            })
            .collect()
    }

    /// Typed read of the entry for `T::KIND`.
    ///
    /// `Ok(None)` when nothing is cached. A record that no longer matches the
    /// model is reported as [`DataError::CorruptCacheEntry`].
    pub fn read_records<T: Dataset>(&self, ticker: &str) -> Result<Option<Vec<T>>, DataError> {
        let Some(raw) = self.get(T::KIND, ticker) else {
            return Ok(None);
        };
        raw.into_iter()
            .map(|record| {
                serde_json::from_value::<T>(Value::Object(record)).map_err(|e| {
                    DataError::CorruptCacheEntry {
                        kind: T::KIND,
                        ticker: normalize_ticker(ticker),
                        reason: e.to_string(),
                    }
                })
            })
            .collect::<Result<Vec<T>, _>>()
            .map(Some)
    }

    /// Typed write of `records` under `T::KIND`. Returns the stored record count.
    pub fn put_records<T: Dataset>(
        &self,
        ticker: &str,
        records: &[T],
        policy: WritePolicy,
    ) -> Result<usize, DataError> {
        let merged;
        let to_store: &[T] = match policy {
            WritePolicy::Replace => records,
            WritePolicy::MergeByKey => {
                let existing = self.read_records::<T>(ticker)?.unwrap_or_default();
                merged = merge_by_identity(existing, records);
                &merged
            }
        };

        let raw = to_store
            .iter()
            .map(to_raw_record)
            .collect::<Result<Vec<_>, _>>()?;
        let count = raw.len();
        self.set(T::KIND, ticker, raw);
        Ok(count)
    }

    /// Write every entry to `path` as JSON plus a `{path}.meta.json` sidecar
    /// holding the BLAKE3 hash of the data file.
    pub fn save_snapshot(&self, path: &Path) -> Result<SnapshotMeta, DataError> {
        let entries: Vec<CacheEntry> = self.read().values().cloned().collect();
        let data = serde_json::to_vec_pretty(&entries)
            .map_err(|e| DataError::CacheError(format!("snapshot serialization: {e}")))?;

        let meta = SnapshotMeta {
            entry_count: entries.len(),
            record_count: entries.iter().map(|e| e.records.len()).sum(),
            data_hash: blake3::hash(&data).to_hex().to_string(),
            saved_at: Utc::now(),
        };
        let meta_json = serde_json::to_vec_pretty(&meta)
            .map_err(|e| DataError::CacheError(format!("meta serialization: {e}")))?;

        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .map_err(|e| DataError::CacheError(format!("failed to create dir: {e}")))?;
        }
        write_atomic(path, &data)?;
        write_atomic(&meta_path(path), &meta_json)?;

        tracing::debug!(
            path = %path.display(),
            entries = meta.entry_count,
            records = meta.record_count,
            "cache snapshot saved"
        );
        Ok(meta)
    }

    /// Load a snapshot written by [`CacheStore::save_snapshot`].
    ///
    /// A missing file yields an empty store. A file whose hash does not match
    /// its sidecar (or has no sidecar) is renamed to `*.quarantined` and an
    /// empty store is returned.
    pub fn load_snapshot(path: &Path) -> Result<Self, DataError> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let data = fs::read(path)
            .map_err(|e| DataError::CacheError(format!("snapshot read: {e}")))?;

        if let Err(reason) = verify_snapshot(path, &data) {
            let quarantine = path.with_extension("quarantined");
            tracing::warn!(
                path = %path.display(),
                %reason,
                "quarantining corrupt cache snapshot"
            );
            let _ = fs::rename(path, &quarantine);
            return Ok(Self::new());
        }

        let entries: Vec<CacheEntry> = serde_json::from_slice(&data)
            .map_err(|e| DataError::CacheError(format!("snapshot parse: {e}")))?;

        let store = Self::new();
        {
            let mut map = store.write();
            for entry in entries {
                map.insert(Self::key(entry.kind, &entry.ticker), entry);
            }
        }
        tracing::debug!(path = %path.display(), entries = store.len(), "cache snapshot loaded");
        Ok(store)
    }
}

/// Union of `existing` and `fresh` keyed by identity; `fresh` wins.
fn merge_by_identity<T: Dataset>(existing: Vec<T>, fresh: &[T]) -> Vec<T> {
    let mut by_id: BTreeMap<String, T> = BTreeMap::new();
    for record in existing {
        by_id.insert(record.identity(), record);
    }
    for record in fresh {
        by_id.insert(record.identity(), record.clone());
    }
    let mut merged: Vec<T> = by_id.into_values().collect();
    merged.sort_by_key(|r| r.date());
    merged
}

fn to_raw_record<T: Dataset>(record: &T) -> Result<RawRecord, DataError> {
    match serde_json::to_value(record) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(DataError::CacheError(format!(
            "{} record serialized to non-object: {other}",
            T::KIND
        ))),
        Err(e) => Err(DataError::CacheError(format!(
            "{} record serialization: {e}",
            T::KIND
        ))),
    }
}

fn meta_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".meta.json");
    PathBuf::from(name)
}

fn verify_snapshot(path: &Path, data: &[u8]) -> Result<(), String> {
    let meta_raw =
        fs::read_to_string(meta_path(path)).map_err(|e| format!("missing sidecar: {e}"))?;
    let meta: SnapshotMeta =
        serde_json::from_str(&meta_raw).map_err(|e| format!("unreadable sidecar: {e}"))?;
    let actual = blake3::hash(data).to_hex().to_string();
    if actual != meta.data_hash {
        return Err(format!(
            "hash mismatch (expected {}, got {actual})",
            meta.data_hash
        ));
    }
    Ok(())
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), DataError> {
    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    fs::write(&tmp_path, bytes)
        .map_err(|e| DataError::CacheError(format!("snapshot write: {e}")))?;
    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        DataError::CacheError(format!("atomic rename failed: {e}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CompanyNews, Price};
    use chrono::NaiveDate;

    fn bar(day: u32, close: f64) -> Price {
        Price {
            time: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            open: close - 1.0,
            high: close + 1.0,
            low: close - 2.0,
            close,
            volume: 1_000,
        }
    }

    #[test]
    fn get_on_empty_store_is_none() {
        let store = CacheStore::new();
        assert!(store.get(DatasetKind::Prices, "AAPL").is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn set_replaces_previous_sequence() {
        let store = CacheStore::new();
        let mut a = RawRecord::new();
        a.insert("time".into(), Value::from("2024-01-02"));
        let mut b = RawRecord::new();
        b.insert("time".into(), Value::from("2024-02-01"));

        store.set(DatasetKind::Prices, "AAPL", vec![a.clone(), a]);
        store.set(DatasetKind::Prices, "AAPL", vec![b.clone()]);

        assert_eq!(store.get(DatasetKind::Prices, "AAPL"), Some(vec![b]));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn keys_are_independent_per_kind_and_ticker() {
        let store = CacheStore::new();
        store.set(DatasetKind::Prices, "AAPL", vec![RawRecord::new()]);
        assert!(store.get(DatasetKind::CompanyNews, "AAPL").is_none());
        assert!(store.get(DatasetKind::Prices, "MSFT").is_none());
    }

    #[test]
    fn ticker_key_is_normalized() {
        let store = CacheStore::new();
        store.put_records("aapl ", &[bar(2, 100.0)], WritePolicy::Replace).unwrap();
        let read: Vec<Price> = store.read_records("AAPL").unwrap().unwrap();
        assert_eq!(read.len(), 1);
    }

    #[test]
    fn typed_round_trip_preserves_records() {
        let store = CacheStore::new();
        let bars = vec![bar(2, 100.0), bar(3, 101.5)];
        let stored = store.put_records("AAPL", &bars, WritePolicy::Replace).unwrap();
        assert_eq!(stored, 2);

        let raw = store.get(DatasetKind::Prices, "AAPL").unwrap();
        assert_eq!(raw[0]["time"], "2024-01-02");

        let read: Vec<Price> = store.read_records("AAPL").unwrap().unwrap();
        assert_eq!(read, bars);
    }

    #[test]
    fn malformed_record_is_reported_not_dropped() {
        let store = CacheStore::new();
        let mut bad = RawRecord::new();
        bad.insert("time".into(), Value::from("not-a-date"));
        store.set(DatasetKind::Prices, "AAPL", vec![bad]);

        let err = store.read_records::<Price>("AAPL").unwrap_err();
        match err {
            DataError::CorruptCacheEntry { kind, ticker, .. } => {
                assert_eq!(kind, DatasetKind::Prices);
                assert_eq!(ticker, "AAPL");
            }
            other => panic!("expected CorruptCacheEntry, got: {other:?}"),
        }
    }

    #[test]
    fn merge_by_key_keeps_history_and_prefers_fresh() {
        let store = CacheStore::new();
        store
            .put_records("AAPL", &[bar(2, 100.0), bar(3, 101.0)], WritePolicy::Replace)
            .unwrap();
        let stored = store
            .put_records("AAPL", &[bar(3, 105.0), bar(4, 106.0)], WritePolicy::MergeByKey)
            .unwrap();
        assert_eq!(stored, 3);

        let read: Vec<Price> = store.read_records("AAPL").unwrap().unwrap();
        let closes: Vec<f64> = read.iter().map(|p| p.close).collect();
        assert_eq!(closes, vec![100.0, 105.0, 106.0]);
    }

    #[test]
    fn merge_by_key_on_news_dedups_by_url() {
        let store = CacheStore::new();
        let item = |url: &str, title: &str| CompanyNews {
            ticker: "AAPL".into(),
            title: title.into(),
            author: "Reuters".into(),
            source: "Reuters".into(),
            date: NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
            url: url.into(),
            sentiment: None,
        };
        store
            .put_records("AAPL", &[item("https://a", "old")], WritePolicy::Replace)
            .unwrap();
        store
            .put_records(
                "AAPL",
                &[item("https://a", "new"), item("https://b", "other")],
                WritePolicy::MergeByKey,
            )
            .unwrap();
        let read: Vec<CompanyNews> = store.read_records("AAPL").unwrap().unwrap();
        assert_eq!(read.len(), 2);
        assert!(read.iter().any(|n| n.title == "new"));
        assert!(!read.iter().any(|n| n.title == "old"));
    }

    #[test]
    fn eviction_by_key_ticker_and_all() {
        let store = CacheStore::new();
        for (kind, ticker) in [
            (DatasetKind::Prices, "AAPL"),
            (DatasetKind::CompanyNews, "AAPL"),
            (DatasetKind::Prices, "MSFT"),
            (DatasetKind::FinancialMetrics, "MSFT"),
        ] {
            store.set(kind, ticker, vec![RawRecord::new()]);
        }

        assert!(store.remove(DatasetKind::Prices, "msft"));
        assert!(!store.remove(DatasetKind::Prices, "MSFT"));
        assert_eq!(store.remove_ticker(" aapl"), 2);
        assert_eq!(store.remove_ticker("AAPL"), 0);
        assert_eq!(store.len(), 1);

        store.clear();
        assert!(store.is_empty());
    }

    #[test]
    fn status_reports_record_counts() {
        let store = CacheStore::new();
        store
            .put_records("MSFT", &[bar(2, 1.0), bar(3, 2.0)], WritePolicy::Replace)
            .unwrap();
        let status = store.status();
        assert_eq!(status.len(), 1);
        assert_eq!(status[0].ticker, "MSFT");
        assert_eq!(status[0].record_count, 2);
    }

    #[test]
    fn snapshot_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");

        let store = CacheStore::new();
        store
            .put_records("AAPL", &[bar(2, 100.0)], WritePolicy::Replace)
            .unwrap();
        let meta = store.save_snapshot(&path).unwrap();
        assert_eq!(meta.entry_count, 1);
        assert_eq!(meta.record_count, 1);

        let loaded = CacheStore::load_snapshot(&path).unwrap();
        let read: Vec<Price> = loaded.read_records("AAPL").unwrap().unwrap();
        assert_eq!(read, vec![bar(2, 100.0)]);
    }

    #[test]
    fn missing_snapshot_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = CacheStore::load_snapshot(&dir.path().join("absent.json")).unwrap();
        assert!(loaded.is_empty());
    }

    #[test]
    fn tampered_snapshot_is_quarantined() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");

        let store = CacheStore::new();
        store
            .put_records("AAPL", &[bar(2, 100.0)], WritePolicy::Replace)
            .unwrap();
        store.save_snapshot(&path).unwrap();

        let mut data = fs::read_to_string(&path).unwrap();
        data = data.replace("100.0", "999.0");
        fs::write(&path, data).unwrap();

        let loaded = CacheStore::load_snapshot(&path).unwrap();
        assert!(loaded.is_empty());
        assert!(!path.exists());
        assert!(path.with_extension("quarantined").exists());
    }
}
