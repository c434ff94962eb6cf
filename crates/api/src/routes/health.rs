//! Health check endpoints.

use axum::{extract::State, http::StatusCode, Json};
use telemetry::{health, metrics};

use crate::response::HealthResponse;
use crate::state::AppState;

/// GET /health - probes the store, then reports every component.
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    health()
        .clickhouse
        .record(state.store.ping().await, "store ping failed");
    let report = health().report();

    Json(HealthResponse {
        status: format!("{:?}", report.status).to_lowercase(),
        clickhouse_connected: health().clickhouse.is_healthy(),
        feed_connected: health().feed.is_healthy(),
        scheduler_healthy: health().scheduler.is_healthy(),
        last_recompute_unix: metrics().last_recompute_unix.get(),
    })
}

/// GET /health/ready - Readiness probe (store reachable).
pub async fn ready_handler() -> StatusCode {
    if health().is_ready() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// GET /health/live - Liveness probe (service is running).
pub async fn live_handler() -> StatusCode {
    if health().is_alive() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}
