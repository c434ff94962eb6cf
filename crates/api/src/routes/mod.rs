//! API routes.

pub mod forecast;
pub mod health;
pub mod jobs;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/health/ready", get(health::ready_handler))
        .route("/health/live", get(health::live_handler))
        .route("/jobs/ingest", post(jobs::ingest_handler))
        .route("/jobs/recompute", post(jobs::recompute_handler))
        .route("/forecast", get(forecast::forecast_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
