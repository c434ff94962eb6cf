//! HTTP entry point: health probes and job triggers.

use axum::http::StatusCode;
use axum_test::TestServer;
use integration_tests::fixtures::{self, date};
use integration_tests::setup::TestContext;
use outage_core::Series;

fn server(ctx: &TestContext) -> TestServer {
    TestServer::new(ctx.router()).expect("Failed to create test server")
}

/// Test /health/live always answers while the process runs
#[tokio::test]
async fn test_live_probe() {
    let ctx = TestContext::new(Vec::new());

    server(&ctx).get("/health/live").await.assert_status_ok();
}

/// Test /health reports every component
#[tokio::test]
async fn test_health_endpoint_structure() {
    let ctx = TestContext::new(Vec::new());
    let server = server(&ctx);

    let response = server.get("/health").await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    for field in [
        "status",
        "clickhouse_connected",
        "feed_connected",
        "scheduler_healthy",
        "last_recompute_unix",
    ] {
        assert!(body.get(field).is_some(), "Response should have '{}' field", field);
    }
    assert_eq!(body["clickhouse_connected"], true);

    let status = body["status"].as_str().unwrap_or("");
    assert!(
        status == "healthy" || status == "degraded",
        "Store is reachable, got '{}'",
        status
    );

    // The store ping above marks storage healthy, which is all readiness needs.
    server.get("/health/ready").await.assert_status_ok();
}

/// Test ingesting one series returns its report
#[tokio::test]
async fn test_ingest_single_series() {
    let ctx = TestContext::new(fixtures::national_days(date(2024, 1, 1), 12));

    let response = server(&ctx).post("/jobs/ingest").add_query_param("series", "national").await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    assert_eq!(body["success"], true);
    let reports = body["reports"].as_array().unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0]["series"], "national");
    assert_eq!(reports[0]["status"], "complete");
    assert_eq!(reports[0]["inserted"], 12);
    assert_eq!(ctx.store.rows(Series::National).len(), 12);
}

/// Test ingesting without a series runs all three
#[tokio::test]
async fn test_ingest_all_series() {
    let ctx = TestContext::new(fixtures::national_days(date(2024, 1, 1), 5));

    let response = server(&ctx).post("/jobs/ingest").await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    let series: Vec<&str> = body["reports"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["series"].as_str().unwrap())
        .collect();
    assert_eq!(series, vec!["national", "facility", "generator"]);
}

/// Test an unknown series is rejected before any fetch
#[tokio::test]
async fn test_ingest_unknown_series_returns_400() {
    let ctx = TestContext::new(fixtures::national_days(date(2024, 1, 1), 5));

    let response = server(&ctx).post("/jobs/ingest").add_query_param("series", "regional").await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "VALID_001");
    assert_eq!(ctx.feed.call_count(), 0);
}

/// Test a feed failure is reported in the body, not as a server error
#[tokio::test]
async fn test_ingest_feed_failure_reported() {
    let ctx = TestContext::new(fixtures::national_days(date(2024, 1, 1), 5));
    ctx.feed.fail_on_call(Some(0));

    let response = server(&ctx).post("/jobs/ingest").add_query_param("series", "national").await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    assert_eq!(body["success"], false);
    assert_eq!(body["reports"][0]["status"], "partial");
}

/// Test recompute publishes artifacts and returns the run report
#[tokio::test]
async fn test_recompute_trigger() {
    let ctx = TestContext::new(Vec::new());
    ctx.store.seed(Series::National, fixtures::national_series(date(2024, 1, 1), 60));

    let response = server(&ctx).post("/jobs/recompute").await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    assert_eq!(body["artifacts_published"], true);
    assert_eq!(body["clustering"]["status"], "succeeded");
    assert_eq!(body["forecast"]["status"], "ready");
    assert!(ctx.artifacts.cluster_table_path().exists());
}

/// Test the forecast reports insufficient data as a distinct outcome
#[tokio::test]
async fn test_forecast_insufficient_data() {
    let ctx = TestContext::new(Vec::new());
    ctx.store.seed(Series::National, fixtures::national_series(date(2024, 1, 1), 3));

    let response = server(&ctx).get("/forecast").await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "insufficient_data");
    assert_eq!(body["required"], 7);
    assert_eq!(body["actual"], 3);
}

/// Test the forecast predicts the day after the last observation
#[tokio::test]
async fn test_forecast_ready() {
    let ctx = TestContext::new(Vec::new());
    ctx.store.seed(Series::National, fixtures::national_series(date(2024, 1, 1), 30));

    let response = server(&ctx).get("/forecast").await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "ready");
    assert_eq!(body["predicted_date"], "2024-01-31");
    assert_eq!(body["history"].as_array().unwrap().len(), 30);
}
