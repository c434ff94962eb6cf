//! In-memory stand-ins for the feed and the store.

use async_trait::async_trait;
use chrono::NaiveDate;
use feed::{FeedClient, Page, PageRequest};
use outage_core::{
    dedupe_batch, parse_period, Error, InsertSummary, OutageRecord, OutageStore, RecordKey, Result, Series,
};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

/// Mock feed serving raw records the way the EIA API does.
///
/// Records are kept per series, filtered to the requested window, sorted
/// descending by period and sliced by `offset`/`length`. Every request is
/// recorded.
#[derive(Clone, Default)]
pub struct MockFeed {
    records: Arc<Mutex<BTreeMap<Series, Vec<Value>>>>,
    requests: Arc<Mutex<Vec<PageRequest>>>,
    /// Zero-based call index that fails with a transient error.
    fail_on_call: Arc<Mutex<Option<usize>>>,
}

impl MockFeed {
    /// A feed serving `records` as the national series.
    pub fn new(records: Vec<Value>) -> Self {
        let feed = Self::default();
        feed.publish(records);
        feed
    }

    /// Publish more national records, as the upstream would between runs.
    pub fn publish(&self, records: Vec<Value>) {
        self.publish_series(Series::National, records);
    }

    pub fn publish_series(&self, series: Series, records: Vec<Value>) {
        self.records.lock().entry(series).or_default().extend(records);
    }

    pub fn fail_on_call(&self, call: Option<usize>) {
        *self.fail_on_call.lock() = call;
    }

    pub fn requests(&self) -> Vec<PageRequest> {
        self.requests.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn reset_calls(&self) {
        self.requests.lock().clear();
    }

    fn in_window(value: &Value, request: &PageRequest) -> bool {
        match value.get("period").and_then(Value::as_str).and_then(parse_period) {
            Some(period) => period >= request.window.start && period <= request.window.end,
            // Malformed records are still served so the loader sees them.
            None => true,
        }
    }

    fn sort_key(value: &Value) -> Option<NaiveDate> {
        value.get("period").and_then(Value::as_str).and_then(parse_period)
    }
}

#[async_trait]
impl FeedClient for MockFeed {
    async fn fetch_page(&self, request: &PageRequest) -> Result<Page> {
        let call = {
            let mut requests = self.requests.lock();
            requests.push(*request);
            requests.len() - 1
        };
        if *self.fail_on_call.lock() == Some(call) {
            return Err(Error::transient_fetch(format!("mock feed failure on call {}", call)));
        }

        let mut matching: Vec<Value> = self
            .records
            .lock()
            .get(&request.series)
            .into_iter()
            .flatten()
            .filter(|v| Self::in_window(v, request))
            .cloned()
            .collect();
        matching.sort_by(|a, b| Self::sort_key(b).cmp(&Self::sort_key(a)));

        let records = matching
            .into_iter()
            .skip(request.offset)
            .take(request.length)
            .collect();

        Ok(Page {
            offset: request.offset,
            requested: request.length,
            records,
        })
    }

    async fn ping(&self) -> bool {
        self.fail_on_call.lock().is_none()
    }
}

/// Store keeping rows in a map keyed by series and identity key.
#[derive(Clone, Default)]
pub struct MemoryStore {
    rows: Arc<Mutex<BTreeMap<(Series, RecordKey), OutageRecord>>>,
    fail_inserts: Arc<Mutex<bool>>,
    batches: Arc<Mutex<usize>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_inserts(&self, fail: bool) {
        *self.fail_inserts.lock() = fail;
    }

    /// Number of insert commits received.
    pub fn batch_count(&self) -> usize {
        *self.batches.lock()
    }

    pub fn rows(&self, series: Series) -> Vec<OutageRecord> {
        self.rows
            .lock()
            .iter()
            .filter(|((s, _), _)| *s == series)
            .map(|(_, r)| r.clone())
            .collect()
    }

    pub fn seed(&self, series: Series, records: Vec<OutageRecord>) {
        let mut rows = self.rows.lock();
        for record in records {
            rows.insert((series, record.key()), record);
        }
    }
}

#[async_trait]
impl OutageStore for MemoryStore {
    async fn watermark(&self, series: Series) -> Result<Option<NaiveDate>> {
        Ok(self
            .rows
            .lock()
            .keys()
            .filter(|(s, _)| *s == series)
            .map(|(_, key)| key.period)
            .max())
    }

    async fn insert_batch(&self, series: Series, records: Vec<OutageRecord>) -> Result<InsertSummary> {
        if *self.fail_inserts.lock() {
            return Err(Error::storage("mock store failure"));
        }
        *self.batches.lock() += 1;

        let mut rows = self.rows.lock();
        let existing: HashSet<RecordKey> = rows
            .keys()
            .filter(|(s, _)| *s == series)
            .map(|(_, key)| key.clone())
            .collect();
        let (fresh, duplicates) = dedupe_batch(&existing, records);
        let inserted = fresh.len();
        for record in fresh {
            rows.insert((series, record.key()), record);
        }

        Ok(InsertSummary { inserted, duplicates })
    }

    async fn load_series(&self, series: Series) -> Result<Vec<OutageRecord>> {
        // BTreeMap order on RecordKey is period first.
        Ok(self.rows(series))
    }

    async fn count(&self, series: Series) -> Result<u64> {
        Ok(self.rows.lock().keys().filter(|(s, _)| *s == series).count() as u64)
    }

    async fn ping(&self) -> bool {
        !*self.fail_inserts.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use outage_core::FetchWindow;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[tokio::test]
    async fn test_mock_feed_filters_sorts_and_slices() {
        let feed = MockFeed::new(crate::fixtures::national_days(date(1), 10));
        let request = PageRequest {
            series: Series::National,
            window: FetchWindow::new(date(3), date(8)),
            offset: 1,
            length: 2,
        };

        let page = feed.fetch_page(&request).await.unwrap();
        let periods: Vec<&str> = page.records.iter().map(|v| v["period"].as_str().unwrap()).collect();
        assert_eq!(periods, vec!["2024-01-07", "2024-01-06"]);
        assert_eq!(feed.call_count(), 1);
    }

    #[tokio::test]
    async fn test_memory_store_ignores_duplicate_keys() {
        let store = MemoryStore::new();
        let record = OutageRecord::national(date(1), Some(3.0));

        let first = store.insert_batch(Series::National, vec![record.clone()]).await.unwrap();
        let second = store.insert_batch(Series::National, vec![record]).await.unwrap();

        assert_eq!(first.inserted, 1);
        assert_eq!(second, InsertSummary { inserted: 0, duplicates: 1 });
        assert_eq!(store.count(Series::National).await.unwrap(), 1);
    }
}
