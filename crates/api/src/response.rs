//! API response bodies and error mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use worker::IngestReport;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub clickhouse_connected: bool,
    pub feed_connected: bool,
    pub scheduler_healthy: bool,
    pub last_recompute_unix: u64,
}

/// Body of `POST /jobs/ingest`.
#[derive(Debug, Serialize)]
pub struct IngestResponse {
    /// False if any series failed or stopped early.
    pub success: bool,
    pub timestamp: i64,
    pub reports: Vec<IngestReport>,
}

impl IngestResponse {
    pub fn new(reports: Vec<IngestReport>) -> Self {
        Self {
            success: reports.iter().all(IngestReport::is_ok),
            timestamp: chrono::Utc::now().timestamp_millis(),
            reports,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

pub struct ApiError {
    pub status: StatusCode,
    pub response: ErrorResponse,
}

impl ApiError {
    pub fn with_code(status: StatusCode, code: impl Into<String>, msg: impl Into<String>) -> Self {
        Self {
            status,
            response: ErrorResponse {
                error: msg.into(),
                code: code.into(),
            },
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::with_code(StatusCode::BAD_REQUEST, "VALID_001", msg)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.response)).into_response()
    }
}

impl From<outage_core::Error> for ApiError {
    fn from(err: outage_core::Error) -> Self {
        let status = StatusCode::from_u16(err.http_status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        ApiError::with_code(status, err.code(), err.to_string())
    }
}
