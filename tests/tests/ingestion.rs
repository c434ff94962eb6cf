//! Incremental ingestion against a mock feed and an in-memory store.

use chrono::Duration;
use integration_tests::fixtures::{self, date};
use integration_tests::setup::TestContext;
use outage_core::limits::default_epoch;
use outage_core::{OutageStore, Series};
use worker::IngestStatus;

/// Running twice over an unchanged feed leaves the store unchanged
#[tokio::test]
async fn test_second_run_is_a_no_op() {
    let ctx = TestContext::new(fixtures::national_days(date(2024, 1, 1), 30));
    let end = date(2024, 3, 1);

    let first = ctx.ingestion.ingest_until(Series::National, end).await;
    assert_eq!(first.status, IngestStatus::Complete);
    assert_eq!(first.inserted, 30);
    let rows_after_first = ctx.store.rows(Series::National);

    let second = ctx.ingestion.ingest_until(Series::National, end).await;
    assert_eq!(second.inserted, 0);
    assert_eq!(ctx.store.rows(Series::National), rows_after_first);
    assert_eq!(second.watermark_after, first.watermark_after);
}

/// The second run only asks for periods after the watermark
#[tokio::test]
async fn test_window_starts_after_watermark() {
    let ctx = TestContext::new(fixtures::national_days(date(2024, 1, 1), 10));
    let end = date(2024, 2, 1);

    let first = ctx.ingestion.ingest_until(Series::National, end).await;
    assert_eq!(first.window.unwrap().start, default_epoch());
    assert_eq!(first.watermark_after, Some(date(2024, 1, 10)));

    ctx.feed.publish(fixtures::national_days(date(2024, 1, 11), 5));
    ctx.feed.reset_calls();
    let second = ctx.ingestion.ingest_until(Series::National, end).await;

    let requests = ctx.feed.requests();
    assert!(!requests.is_empty());
    assert!(requests.iter().all(|r| r.window.start == date(2024, 1, 11)));
    assert_eq!(second.inserted, 5);
    assert_eq!(second.duplicates, 0);
}

/// The watermark never moves backwards
#[tokio::test]
async fn test_watermark_is_monotonic() {
    let ctx = TestContext::new(fixtures::national_days(date(2024, 1, 1), 20));
    let end = date(2024, 2, 1);

    let mut previous = None;
    for batch_start in [21, 26] {
        let report = ctx.ingestion.ingest_until(Series::National, end).await;
        assert!(report.watermark_after >= previous);
        assert!(report.watermark_after >= report.watermark_before);
        previous = report.watermark_after;
        ctx.feed.publish(fixtures::national_days(date(2024, 1, batch_start), 5));
    }

    // Late-arriving rows older than the watermark are outside the next window.
    ctx.feed.publish(vec![fixtures::national_record(date(2023, 12, 31), 4.0)]);
    let report = ctx.ingestion.ingest_until(Series::National, end).await;
    assert_eq!(report.watermark_after, Some(date(2024, 1, 30)));
    assert!(report.watermark_after >= previous);
}

/// A feed serving full pages until a short one costs ceil(total/length) calls
#[tokio::test]
async fn test_pagination_stops_on_short_page() {
    let ctx = TestContext::with_page_size(fixtures::national_days(date(2024, 1, 1), 12), 5);

    let report = ctx.ingestion.ingest_until(Series::National, date(2024, 2, 1)).await;

    assert_eq!(report.calls, 3);
    assert_eq!(ctx.feed.call_count(), 3);
    assert_eq!(report.pages, 3);
    assert_eq!(report.inserted, 12);

    let offsets: Vec<usize> = ctx.feed.requests().iter().map(|r| r.offset).collect();
    assert_eq!(offsets, vec![0, 5, 10]);
    assert!(ctx.feed.requests().iter().all(|r| r.length == 5));
}

/// One malformed record is skipped and reported, the rest of the page lands
#[tokio::test]
async fn test_malformed_record_is_skipped() {
    let mut records = fixtures::national_days(date(2024, 1, 1), 9);
    records.push(fixtures::record_without_period());
    let ctx = TestContext::new(records);

    let report = ctx.ingestion.ingest_until(Series::National, date(2024, 2, 1)).await;

    assert_eq!(report.status, IngestStatus::Complete);
    assert_eq!(report.inserted, 9);
    assert_eq!(report.rejected.len(), 1);
    assert_eq!(report.rejected[0].code, "VALID_001");
    assert!(report.rejected[0].record.get("period").is_none());
    assert_eq!(ctx.store.count(Series::National).await.unwrap(), 9);
}

/// Facility rows without a facility identifier are rejected
#[tokio::test]
async fn test_facility_rows_require_identifier() {
    let day = date(2024, 1, 5);
    let mut missing = fixtures::facility_record(day, "", 2.0);
    missing["facility"] = serde_json::Value::Null;
    let ctx = TestContext::new(Vec::new());
    ctx.feed.publish_series(
        Series::Facility,
        vec![
            fixtures::facility_record(day, "6022", 1.5),
            fixtures::facility_record(day, "204", 0.0),
            missing,
        ],
    );

    let report = ctx.ingestion.ingest_until(Series::Facility, date(2024, 2, 1)).await;

    assert_eq!(report.inserted, 2);
    assert_eq!(report.rejected.len(), 1);
    let rows = ctx.store.rows(Series::Facility);
    assert!(rows.iter().all(|r| r.facility_id.is_some()));
    assert_eq!(ctx.store.count(Series::National).await.unwrap(), 0);
}

/// Generator rows are keyed by facility and generator
#[tokio::test]
async fn test_generator_rows_keyed_by_unit() {
    let day = date(2024, 1, 5);
    let ctx = TestContext::new(Vec::new());
    ctx.feed.publish_series(
        Series::Generator,
        vec![
            fixtures::generator_record(day, "6022", "1", 0.0),
            fixtures::generator_record(day, "6022", "2", 100.0),
            fixtures::generator_record(day, "6022", "2", 100.0),
        ],
    );

    let report = ctx.ingestion.ingest_until(Series::Generator, date(2024, 2, 1)).await;

    assert_eq!(report.inserted, 2);
    assert_eq!(report.duplicates, 1);
}

/// A feed failure mid-window commits nothing, so the watermark stays put
#[tokio::test]
async fn test_transient_failure_defers_window() {
    let ctx = TestContext::with_page_size(fixtures::national_days(date(2024, 1, 1), 12), 5);
    ctx.feed.fail_on_call(Some(1));

    let report = ctx.ingestion.ingest_until(Series::National, date(2024, 2, 1)).await;

    assert_eq!(report.status, IngestStatus::Partial);
    assert!(!report.is_ok());
    assert!(report.error.is_some());
    assert_eq!(report.calls, 2);
    assert_eq!(report.pages, 1);
    assert_eq!(report.uncommitted, 5);
    assert_eq!(report.inserted, 0);
    assert_eq!(report.watermark_after, None);
    assert_eq!(ctx.store.count(Series::National).await.unwrap(), 0);
}

/// The run after a transient failure fetches the whole window again
#[tokio::test]
async fn test_next_run_recovers_after_transient_failure() {
    let ctx = TestContext::with_page_size(fixtures::national_days(date(2024, 1, 1), 12), 5);
    ctx.feed.fail_on_call(Some(1));
    let end = date(2024, 2, 1);

    let first = ctx.ingestion.ingest_until(Series::National, end).await;
    assert_eq!(first.status, IngestStatus::Partial);

    ctx.feed.fail_on_call(None);
    ctx.feed.reset_calls();
    let second = ctx.ingestion.ingest_until(Series::National, end).await;

    assert_eq!(second.status, IngestStatus::Complete);
    assert_eq!(second.inserted, 12);
    assert_eq!(second.watermark_after, Some(date(2024, 1, 12)));
    assert!(ctx.feed.requests().iter().all(|r| r.window.start == default_epoch()));

    let third = ctx.ingestion.ingest_until(Series::National, end).await;
    assert_eq!(third.inserted, 0);
    assert_eq!(ctx.store.count(Series::National).await.unwrap(), 12);
}

/// Resuming from an existing watermark, a failure leaves that watermark alone
#[tokio::test]
async fn test_failure_after_watermark_leaves_no_gap() {
    let ctx = TestContext::with_page_size(fixtures::national_days(date(2024, 1, 1), 3), 5);
    let end = date(2024, 2, 1);
    ctx.ingestion.ingest_until(Series::National, end).await;

    ctx.feed.publish(fixtures::national_days(date(2024, 1, 4), 12));
    ctx.feed.reset_calls();
    ctx.feed.fail_on_call(Some(2));
    let failed = ctx.ingestion.ingest_until(Series::National, end).await;
    assert_eq!(failed.status, IngestStatus::Partial);
    assert_eq!(failed.watermark_after, Some(date(2024, 1, 3)));

    ctx.feed.fail_on_call(None);
    let recovered = ctx.ingestion.ingest_until(Series::National, end).await;
    assert_eq!(recovered.inserted, 12);

    let periods: Vec<_> = ctx.store.rows(Series::National).iter().map(|r| r.period).collect();
    let expected: Vec<_> = (0..15).map(|i| date(2024, 1, 1) + Duration::days(i)).collect();
    assert_eq!(periods, expected);
}

/// A storage failure stops the cycle and is reported, not raised
#[tokio::test]
async fn test_storage_failure_is_reported() {
    let ctx = TestContext::new(fixtures::national_days(date(2024, 1, 1), 5));
    ctx.store.set_fail_inserts(true);

    let report = ctx.ingestion.ingest_until(Series::National, date(2024, 2, 1)).await;

    assert_eq!(report.status, IngestStatus::Failed);
    assert!(report.error.unwrap().contains("mock store failure"));
    assert_eq!(ctx.store.batch_count(), 0);
}

/// An up-to-date series does not call the feed
#[tokio::test]
async fn test_empty_window_makes_no_call() {
    let ctx = TestContext::new(Vec::new());
    let today = date(2024, 3, 1);
    ctx.store
        .seed(Series::National, fixtures::national_series(today - Duration::days(2), 3));

    let report = ctx.ingestion.ingest_until(Series::National, today).await;

    assert_eq!(report.status, IngestStatus::UpToDate);
    assert!(report.window.is_none());
    assert_eq!(ctx.feed.call_count(), 0);
}

/// Each page is committed as a single insert
#[tokio::test]
async fn test_one_commit_per_page() {
    let ctx = TestContext::with_page_size(fixtures::national_days(date(2024, 1, 1), 12), 5);

    ctx.ingestion.ingest_until(Series::National, date(2024, 2, 1)).await;

    assert_eq!(ctx.store.batch_count(), 3);
}

/// `ingest_all` reports every series in order
#[tokio::test]
async fn test_ingest_all_covers_every_series() {
    let ctx = TestContext::new(Vec::new());

    let reports = ctx.ingestion.ingest_all().await;

    let series: Vec<Series> = reports.iter().map(|r| r.series).collect();
    assert_eq!(series, Series::ALL.to_vec());
    assert!(reports.iter().all(|r| r.is_ok()));
}
