//! Incremental loader: raw page records into the store.

use outage_core::{FeedRecord, InsertSummary, OutageRecord, OutageStore, Result, Series};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use telemetry::metrics;
use tracing::{debug, warn};

/// One record the loader skipped.
#[derive(Debug, Clone, Serialize)]
pub struct RecordFailure {
    pub series: Series,
    pub code: &'static str,
    pub message: String,
    /// The offending record as received.
    pub record: Value,
}

/// Result of loading one batch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadReport {
    pub inserted: usize,
    pub duplicates: usize,
    pub rejected: Vec<RecordFailure>,
}

fn decode(series: Series, raw: &Value) -> Result<OutageRecord> {
    let record: FeedRecord = serde_json::from_value(raw.clone())?;
    record.into_record(series)
}

/// Validates records one by one and commits each batch as a single insert.
#[derive(Clone)]
pub struct Loader {
    store: Arc<dyn OutageStore>,
}

impl Loader {
    pub fn new(store: Arc<dyn OutageStore>) -> Self {
        Self { store }
    }

    /// Persist `raw` records for `series`.
    ///
    /// Bad records are logged and skipped. Only a storage failure is an error,
    /// and it fails the whole batch.
    pub async fn load(&self, series: Series, raw: &[Value]) -> Result<LoadReport> {
        let mut report = LoadReport::default();
        let mut records = Vec::with_capacity(raw.len());

        for value in raw {
            match decode(series, value) {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!(series = %series, error = %e, record = %value, "Skipping invalid record");
                    metrics().records_rejected.inc();
                    report.rejected.push(RecordFailure {
                        series,
                        code: e.code(),
                        message: e.to_string(),
                        record: value.clone(),
                    });
                }
            }
        }

        let InsertSummary {
            inserted,
            duplicates,
        } = self.store.insert_batch(series, records).await?;

        metrics().records_inserted.inc_by(inserted as u64);
        metrics().records_duplicate.inc_by(duplicates as u64);
        debug!(
            series = %series,
            inserted,
            duplicates,
            rejected = report.rejected.len(),
            "Loaded batch"
        );

        report.inserted = inserted;
        report.duplicates = duplicates;
        Ok(report)
    }
}
