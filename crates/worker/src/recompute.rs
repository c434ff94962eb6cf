//! Recompute job: load the series, run the numeric stages, publish artifacts.

use analytics::{
    cluster_rows, cluster_severity, decompose, forecast_next, forecast_rows, percent_series, season_counts,
};
use chrono::{DateTime, Utc};
use outage_core::limits::{CLUSTER_COUNT, CLUSTER_SEED, ROLLING_WINDOW, SEASONAL_PERIOD};
use outage_core::{
    ClusterRow, Error, ForecastOutcome, OutageRecord, OutageStore, Result, SeasonCount, Series,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use telemetry::metrics;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::artifacts::ArtifactStore;

/// Outcome of one numeric stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StageStatus {
    Succeeded { rows: usize },
    Failed { code: &'static str, message: String },
}

impl StageStatus {
    fn failed(e: &Error) -> Self {
        Self::Failed {
            code: e.code(),
            message: e.to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }
}

/// What one recompute run produced.
#[derive(Debug, Clone, Serialize)]
pub struct RecomputeReport {
    pub run_id: Uuid,
    pub series: Series,
    pub started_at: DateTime<Utc>,
    pub rows: usize,
    pub decomposition: StageStatus,
    pub clustering: StageStatus,
    pub forecast_stage: StageStatus,
    pub forecast: Option<ForecastOutcome>,
    pub artifacts_published: bool,
}

impl RecomputeReport {
    /// True when every stage succeeded and artifacts were published.
    pub fn is_complete(&self) -> bool {
        self.decomposition.is_success()
            && self.clustering.is_success()
            && self.forecast_stage.is_success()
            && self.artifacts_published
    }
}

/// Stage results computed on the blocking pool.
struct Computed {
    decomposition: StageStatus,
    clustering: StageStatus,
    forecast_stage: StageStatus,
    forecast: Option<ForecastOutcome>,
    cluster_rows: Option<Vec<ClusterRow>>,
    season_counts: Option<Vec<SeasonCount>>,
}

fn compute(records: &[OutageRecord]) -> Computed {
    let observations = percent_series(records);

    let decomposition = decompose(&observations, SEASONAL_PERIOD);
    let decomposition_status = match &decomposition {
        Ok(d) => StageStatus::Succeeded { rows: d.len() },
        Err(e) => StageStatus::failed(e),
    };

    let (clustering, cluster_rows, season_counts) = match cluster_severity(&observations, CLUSTER_COUNT, CLUSTER_SEED) {
        Ok(assignments) => (
            StageStatus::Succeeded {
                rows: assignments.len(),
            },
            Some(cluster_rows(&assignments, decomposition.as_ref().ok())),
            Some(season_counts(&assignments)),
        ),
        Err(e) => (StageStatus::failed(&e), None, None),
    };

    let (forecast_stage, forecast) = match forecast_next(&forecast_rows(records), ROLLING_WINDOW) {
        Ok(outcome @ ForecastOutcome::Ready(_)) => (StageStatus::Succeeded { rows: 1 }, Some(outcome)),
        Ok(outcome @ ForecastOutcome::InsufficientData { required, actual }) => (
            StageStatus::failed(&Error::insufficient(required, actual)),
            Some(outcome),
        ),
        Err(e) => (StageStatus::failed(&e), None),
    };

    Computed {
        decomposition: decomposition_status,
        clustering,
        forecast_stage,
        forecast,
        cluster_rows,
        season_counts,
    }
}

/// Runs the numeric stages over one persisted series.
#[derive(Clone)]
pub struct RecomputeJob {
    store: Arc<dyn OutageStore>,
    artifacts: ArtifactStore,
    series: Series,
}

impl RecomputeJob {
    pub fn new(store: Arc<dyn OutageStore>, artifacts: ArtifactStore, series: Series) -> Self {
        Self {
            store,
            artifacts,
            series,
        }
    }

    pub fn artifacts(&self) -> &ArtifactStore {
        &self.artifacts
    }

    pub fn series(&self) -> Series {
        self.series
    }

    /// Recompute and publish.
    ///
    /// Stage failures are reported in the returned report. A storage read
    /// failure or an artifact write failure is an error.
    pub async fn run(&self) -> Result<RecomputeReport> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let timer = Instant::now();
        metrics().recompute_runs.inc();

        let result = self.run_inner(run_id, started_at).await;

        metrics().recompute_latency_ms.observe(timer.elapsed().as_millis() as u64);
        metrics().last_recompute_unix.set(Utc::now().timestamp().max(0) as u64);
        if let Err(ref e) = result {
            metrics().recompute_failures.inc();
            error!(run_id = %run_id, error = %e, "Recompute failed");
        }
        result
    }

    async fn run_inner(&self, run_id: Uuid, started_at: DateTime<Utc>) -> Result<RecomputeReport> {
        let records = self.store.load_series(self.series).await?;
        let rows = records.len();
        info!(run_id = %run_id, series = %self.series, rows, "Recompute started");

        let computed = tokio::task::spawn_blocking(move || compute(&records))
            .await
            .map_err(|e| Error::internal(format!("analytics task failed: {}", e)))?;

        for (stage, status) in [
            ("decomposition", &computed.decomposition),
            ("clustering", &computed.clustering),
            ("forecast", &computed.forecast_stage),
        ] {
            if let StageStatus::Failed { code, message } = status {
                warn!(run_id = %run_id, stage, code, message = %message, "Stage did not complete");
            }
        }

        let mut artifacts_published = false;
        if let (Some(cluster_rows), Some(season_counts)) = (&computed.cluster_rows, &computed.season_counts) {
            self.artifacts.write_cluster_table(cluster_rows).await?;
            self.artifacts.write_season_counts(season_counts).await?;
            artifacts_published = true;
        }

        let report = RecomputeReport {
            run_id,
            series: self.series,
            started_at,
            rows,
            decomposition: computed.decomposition,
            clustering: computed.clustering,
            forecast_stage: computed.forecast_stage,
            forecast: computed.forecast,
            artifacts_published,
        };
        info!(
            run_id = %run_id,
            complete = report.is_complete(),
            artifacts_published,
            "Recompute finished"
        );
        Ok(report)
    }

    /// Forecast computed on read from the current persisted series.
    pub async fn forecast(&self) -> Result<ForecastOutcome> {
        let records = self.store.load_series(self.series).await?;
        tokio::task::spawn_blocking(move || forecast_next(&forecast_rows(&records), ROLLING_WINDOW))
            .await
            .map_err(|e| Error::internal(format!("forecast task failed: {}", e)))?
    }
}
