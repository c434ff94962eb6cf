//! EIA client against a local HTTP server speaking the v2 envelope.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::NaiveDate;
use feed::{EiaClient, FeedClient, FeedConfig, PageRequest, PaginatedFetcher};
use integration_tests::fixtures::{self, date};
use outage_core::{FetchWindow, Series};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Clone)]
struct Upstream {
    records: Arc<Vec<Value>>,
    queries: Arc<Mutex<Vec<HashMap<String, String>>>>,
}

async fn national(State(upstream): State<Upstream>, Query(params): Query<HashMap<String, String>>) -> Json<Value> {
    let offset: usize = params.get("offset").and_then(|v| v.parse().ok()).unwrap_or(0);
    let length: usize = params.get("length").and_then(|v| v.parse().ok()).unwrap_or(5000);
    upstream.queries.lock().push(params);

    let data: Vec<Value> = upstream.records.iter().skip(offset).take(length).cloned().collect();
    Json(json!({ "response": { "total": upstream.records.len(), "data": data } }))
}

async fn failing() -> (StatusCode, &'static str) {
    (StatusCode::INTERNAL_SERVER_ERROR, "upstream exploded")
}

async fn without_data() -> Json<Value> {
    Json(json!({ "response": { "warnings": [] } }))
}

async fn root() -> &'static str {
    "ok"
}

/// Serve `records` (newest first) and return the base URL.
async fn start_upstream(records: Vec<Value>) -> (String, Upstream) {
    let mut records = records;
    records.reverse();
    let upstream = Upstream {
        records: Arc::new(records),
        queries: Arc::new(Mutex::new(Vec::new())),
    };

    let app = Router::new()
        .route("/v2/nuclear-outages/", get(root))
        .route("/v2/nuclear-outages/us-nuclear-outages/data/", get(national))
        .route("/v2/nuclear-outages/facility-nuclear-outages/data/", get(failing))
        .route("/v2/nuclear-outages/generator-nuclear-outages/data/", get(without_data))
        .with_state(upstream.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}/v2/nuclear-outages", addr), upstream)
}

fn client(base_url: String) -> EiaClient {
    EiaClient::new(FeedConfig {
        base_url,
        api_key: Some("test-key".to_string()),
        ..FeedConfig::default()
    })
    .unwrap()
}

fn window() -> FetchWindow {
    FetchWindow::new(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), date(2024, 6, 30))
}

#[tokio::test]
async fn test_page_request_query() {
    let (base_url, upstream) = start_upstream(fixtures::national_days(date(2024, 1, 1), 8)).await;
    let client = client(base_url);

    let page = client
        .fetch_page(&PageRequest {
            series: Series::National,
            window: window(),
            offset: 0,
            length: 5,
        })
        .await
        .unwrap();

    assert_eq!(page.len(), 5);
    assert!(!page.is_short());
    assert_eq!(page.records[0]["period"], "2024-01-08");

    let queries = upstream.queries.lock();
    let query = &queries[0];
    assert_eq!(query["api_key"], "test-key");
    assert_eq!(query["frequency"], "daily");
    assert_eq!(query["data[0]"], "capacity");
    assert_eq!(query["data[1]"], "outage");
    assert_eq!(query["data[2]"], "percentOutage");
    assert_eq!(query["start"], "2024-01-01");
    assert_eq!(query["end"], "2024-06-30");
    assert_eq!(query["sort[0][column]"], "period");
    assert_eq!(query["sort[0][direction]"], "desc");
    assert_eq!(query["offset"], "0");
    assert_eq!(query["length"], "5");
}

#[tokio::test]
async fn test_paginated_fetch_over_http() {
    let (base_url, upstream) = start_upstream(fixtures::national_days(date(2024, 1, 1), 12)).await;
    let fetcher = PaginatedFetcher::new(Arc::new(client(base_url)), 5, 100);

    let outcome = fetcher.fetch_all(Series::National, window()).await;

    assert!(!outcome.is_partial());
    assert_eq!(outcome.calls, 3);
    assert_eq!(outcome.record_count(), 12);
    let offsets: Vec<String> = upstream.queries.lock().iter().map(|q| q["offset"].clone()).collect();
    assert_eq!(offsets, vec!["0", "5", "10"]);
}

#[tokio::test]
async fn test_non_2xx_is_fetch_error() {
    let (base_url, _) = start_upstream(Vec::new()).await;

    let err = client(base_url)
        .fetch_page(&PageRequest {
            series: Series::Facility,
            window: window(),
            offset: 0,
            length: 5000,
        })
        .await
        .unwrap_err();

    assert_eq!(err.code(), "FETCH_001");
    assert!(err.is_retriable());
    assert!(err.to_string().contains("500"));
    assert!(err.to_string().contains("upstream exploded"));
}

#[tokio::test]
async fn test_missing_data_is_empty_page() {
    let (base_url, _) = start_upstream(Vec::new()).await;

    let page = client(base_url)
        .fetch_page(&PageRequest {
            series: Series::Generator,
            window: window(),
            offset: 0,
            length: 5000,
        })
        .await
        .unwrap();

    assert!(page.is_empty());
    assert!(page.is_short());
}

#[tokio::test]
async fn test_ping() {
    let (base_url, _) = start_upstream(Vec::new()).await;

    assert!(client(base_url).ping().await);
    assert!(!client("http://127.0.0.1:9/v2/nuclear-outages".to_string()).ping().await);
}
