//! `OutageStore` backed by ClickHouse.

use async_trait::async_trait;
use chrono::NaiveDate;
use outage_core::{dedupe_batch, InsertSummary, OutageRecord, OutageStore, Result, Series};
use telemetry::metrics;
use tracing::{debug, warn};

use crate::client::ClickHouseClient;
use crate::{health, insert, query};

/// Pre-insert dedup against the stored keys of the batch's period range.
/// `ReplacingMergeTree` collapses anything a concurrent writer slips in.
#[derive(Clone)]
pub struct ClickHouseStore {
    client: ClickHouseClient,
}

impl ClickHouseStore {
    pub fn new(client: ClickHouseClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ClickHouseClient {
        &self.client
    }
}

fn storage_failure<T>(result: Result<T>) -> Result<T> {
    if result.is_err() {
        metrics().storage_errors.inc();
    }
    result
}

#[async_trait]
impl OutageStore for ClickHouseStore {
    async fn watermark(&self, series: Series) -> Result<Option<NaiveDate>> {
        storage_failure(query::watermark(&self.client, series).await)
    }

    async fn insert_batch(&self, series: Series, records: Vec<OutageRecord>) -> Result<InsertSummary> {
        let (Some(from), Some(to)) = (
            records.iter().map(|r| r.period).min(),
            records.iter().map(|r| r.period).max(),
        ) else {
            return Ok(InsertSummary::default());
        };

        let existing = storage_failure(query::existing_keys(&self.client, series, from, to).await)?;
        let (fresh, duplicates) = dedupe_batch(&existing, records);
        if duplicates > 0 {
            debug!(series = %series, duplicates, "Skipping already stored keys");
        }

        let inserted = storage_failure(insert::insert_records(&self.client, series, fresh).await)
            .inspect_err(|e| warn!(series = %series, error = %e, "Batch insert failed"))?;

        Ok(InsertSummary {
            inserted,
            duplicates,
        })
    }

    async fn load_series(&self, series: Series) -> Result<Vec<OutageRecord>> {
        storage_failure(query::load_series(&self.client, series).await)
    }

    async fn count(&self, series: Series) -> Result<u64> {
        storage_failure(query::count_rows(&self.client, series).await)
    }

    async fn ping(&self) -> bool {
        health::check_connection(&self.client).await
    }
}
