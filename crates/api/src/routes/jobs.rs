//! Job triggers.

use axum::{
    extract::{Query, State},
    Json,
};
use outage_core::Series;
use serde::Deserialize;
use tracing::info;
use worker::RecomputeReport;

use crate::response::{ApiError, IngestResponse};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct IngestParams {
    pub series: Option<String>,
}

/// POST /jobs/ingest[?series=national|facility|generator]
pub async fn ingest_handler(
    State(state): State<AppState>,
    Query(params): Query<IngestParams>,
) -> Result<Json<IngestResponse>, ApiError> {
    let reports = match params.series.as_deref() {
        Some(raw) => {
            let series: Series = raw.parse().map_err(|e: outage_core::Error| ApiError::bad_request(e.to_string()))?;
            info!(series = %series, "Ingestion triggered");
            vec![state.ingestion.ingest(series).await]
        }
        None => {
            info!("Ingestion triggered for all series");
            state.ingestion.ingest_all().await
        }
    };

    Ok(Json(IngestResponse::new(reports)))
}

/// POST /jobs/recompute
pub async fn recompute_handler(State(state): State<AppState>) -> Result<Json<RecomputeReport>, ApiError> {
    info!("Recompute triggered");
    let report = state.recompute.run().await?;
    Ok(Json(report))
}
