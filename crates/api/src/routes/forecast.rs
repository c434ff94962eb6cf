//! Forecast endpoint.

use axum::{extract::State, Json};
use outage_core::ForecastOutcome;

use crate::response::ApiError;
use crate::state::AppState;

/// GET /forecast - computed on read, never cached.
pub async fn forecast_handler(State(state): State<AppState>) -> Result<Json<ForecastOutcome>, ApiError> {
    Ok(Json(state.recompute.forecast().await?))
}
