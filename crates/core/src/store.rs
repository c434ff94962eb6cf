//! Storage abstraction for persisted outage series.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::Result;
use crate::record::{OutageRecord, RecordKey, Series};

/// Outcome of one batch insert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsertSummary {
    /// Rows newly written.
    pub inserted: usize,
    /// Records whose identity key was already present (no-ops).
    pub duplicates: usize,
}

/// Durable store for the raw outage tables.
///
/// Implementations enforce uniqueness of `OutageRecord::key()` per series:
/// a record whose key already exists is a no-op, never an error.
#[async_trait]
pub trait OutageStore: Send + Sync {
    /// Latest persisted period for `series`, `None` when the table is empty.
    async fn watermark(&self, series: Series) -> Result<Option<NaiveDate>>;

    /// Persist `records` as a single commit.
    async fn insert_batch(&self, series: Series, records: Vec<OutageRecord>) -> Result<InsertSummary>;

    /// Every persisted row for `series`, ascending by period.
    async fn load_series(&self, series: Series) -> Result<Vec<OutageRecord>>;

    /// Number of distinct persisted rows.
    async fn count(&self, series: Series) -> Result<u64>;

    /// Cheap connectivity probe.
    async fn ping(&self) -> bool;
}

/// Drop records whose key is in `existing` or repeats earlier in the batch.
///
/// Returns the records to write and the number of dropped duplicates.
pub fn dedupe_batch(
    existing: &HashSet<RecordKey>,
    records: Vec<OutageRecord>,
) -> (Vec<OutageRecord>, usize) {
    let mut seen: HashSet<RecordKey> = HashSet::with_capacity(records.len());
    let mut fresh = Vec::with_capacity(records.len());
    let mut duplicates = 0;

    for record in records {
        let key = record.key();
        if existing.contains(&key) || !seen.insert(key) {
            duplicates += 1;
        } else {
            fresh.push(record);
        }
    }

    (fresh, duplicates)
}
