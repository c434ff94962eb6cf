//! ClickHouse-backed store.
//!
//! Requires Docker to be running for testcontainers, or
//! `OUTAGES_TEST_CLICKHOUSE_URL` pointing at a server.

use clickhouse_client::truncate_series;
use integration_tests::fixtures::{self, date};
use integration_tests::setup::{ClickHouseContext, TestContext};
use outage_core::{OutageRecord, OutageStore, Series};
use std::sync::Arc;
use worker::{IngestStatus, IngestionWorker, Loader, WatermarkTracker};

/// Test an empty table has no watermark
#[tokio::test]
async fn test_empty_table_has_no_watermark() {
    let ctx = ClickHouseContext::new().await;

    assert_eq!(ctx.store.watermark(Series::National).await.unwrap(), None);
    assert_eq!(ctx.store.count(Series::Generator).await.unwrap(), 0);
    assert!(ctx.store.ping().await);
}

/// Test re-inserting stored keys is a no-op
#[tokio::test]
async fn test_duplicate_keys_are_no_ops() {
    let ctx = ClickHouseContext::new().await;
    let rows = fixtures::national_series(date(2024, 1, 1), 10);

    let first = ctx.store.insert_batch(Series::National, rows.clone()).await.unwrap();
    assert_eq!(first.inserted, 10);

    let mut overlap = rows[5..].to_vec();
    overlap.extend(fixtures::national_series(date(2024, 1, 11), 2));
    let second = ctx.store.insert_batch(Series::National, overlap).await.unwrap();

    assert_eq!(second.inserted, 2);
    assert_eq!(second.duplicates, 5);
    assert_eq!(ctx.store.count(Series::National).await.unwrap(), 12);
    assert_eq!(ctx.store.watermark(Series::National).await.unwrap(), Some(date(2024, 1, 12)));
}

/// Test rows come back ascending and unchanged
#[tokio::test]
async fn test_load_series_round_trip() {
    let ctx = ClickHouseContext::new().await;
    let mut rows = fixtures::national_series(date(2024, 2, 1), 5);
    rows[2].percent_outage = None;
    let mut shuffled = rows.clone();
    shuffled.reverse();

    ctx.store.insert_batch(Series::National, shuffled).await.unwrap();
    let loaded = ctx.store.load_series(Series::National).await.unwrap();

    assert_eq!(loaded, rows);
}

/// Test generator rows keep both identifiers in the key
#[tokio::test]
async fn test_generator_keys() {
    let ctx = ClickHouseContext::new().await;
    let unit = |generator: &str| {
        let mut record = OutageRecord::national(date(2024, 3, 1), Some(0.0));
        record.facility_id = Some("6022".to_string());
        record.facility_name = Some("Plant 6022".to_string());
        record.generator_id = Some(generator.to_string());
        record
    };

    let summary = ctx
        .store
        .insert_batch(Series::Generator, vec![unit("1"), unit("2"), unit("2")])
        .await
        .unwrap();

    assert_eq!(summary.inserted, 2);
    assert_eq!(summary.duplicates, 1);
    assert_eq!(ctx.store.count(Series::Generator).await.unwrap(), 2);
    assert_eq!(ctx.store.count(Series::National).await.unwrap(), 0);
}

/// Test truncating a series resets its watermark
#[tokio::test]
async fn test_truncate_resets_watermark() {
    let ctx = ClickHouseContext::new().await;
    ctx.store
        .insert_batch(Series::Facility, vec![{
            let mut record = OutageRecord::national(date(2024, 1, 1), Some(1.0));
            record.facility_id = Some("204".to_string());
            record
        }])
        .await
        .unwrap();

    truncate_series(&ctx.client, Series::Facility).await.unwrap();

    assert_eq!(ctx.store.watermark(Series::Facility).await.unwrap(), None);
}

/// Test two ingestion runs against ClickHouse persist each row once
#[tokio::test]
async fn test_ingestion_idempotent_on_clickhouse() {
    let ch = ClickHouseContext::new().await;
    let mock = TestContext::with_page_size(fixtures::national_days(date(2024, 1, 1), 12), 5);
    let store: Arc<dyn OutageStore> = ch.store.clone();
    let ingestion = IngestionWorker::new(
        feed::PaginatedFetcher::new(Arc::new(mock.feed.clone()), 5, 100),
        WatermarkTracker::new(store.clone(), date(2020, 1, 1)),
        Loader::new(store),
    );

    let first = ingestion.ingest_until(Series::National, date(2024, 2, 1)).await;
    let second = ingestion.ingest_until(Series::National, date(2024, 2, 1)).await;

    assert_eq!(first.status, IngestStatus::Complete);
    assert_eq!(first.inserted, 12);
    assert_eq!(second.inserted, 0);
    assert_eq!(ch.store.count(Series::National).await.unwrap(), 12);
    assert_eq!(ch.store.watermark(Series::National).await.unwrap(), Some(date(2024, 1, 12)));
}
