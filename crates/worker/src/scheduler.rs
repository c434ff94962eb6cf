//! Time-of-day scheduler for the pipeline job.

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Local, NaiveDateTime, NaiveTime};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use telemetry::{health, log_snapshot, metrics};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, info_span, warn, Instrument};

use crate::ingestion::{IngestStatus, IngestionWorker};
use crate::recompute::RecomputeJob;
use crate::schedule::{next_run_at, HistoryEvent, HistoryLog, ScheduleSource};

/// Result of one scheduled job run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RunOutcome {
    Succeeded,
    /// Ran to the end but some part did not complete.
    Partial { reason: String },
    /// Did not produce fresh artifacts; eligible for retry.
    Failed { cause: String },
}

impl RunOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Succeeded => f.write_str("succeeded"),
            Self::Partial { reason } => write!(f, "partial: {}", reason),
            Self::Failed { cause } => write!(f, "failed: {}", cause),
        }
    }
}

/// Work driven by the scheduler.
#[async_trait]
pub trait ScheduledJob: Send + Sync {
    async fn run(&self) -> RunOutcome;
}

/// Ingest every series, then recompute.
pub struct PipelineJob {
    ingestion: IngestionWorker,
    recompute: RecomputeJob,
    ingest_first: bool,
}

impl PipelineJob {
    pub fn new(ingestion: IngestionWorker, recompute: RecomputeJob, ingest_first: bool) -> Self {
        Self {
            ingestion,
            recompute,
            ingest_first,
        }
    }
}

#[async_trait]
impl ScheduledJob for PipelineJob {
    async fn run(&self) -> RunOutcome {
        let mut problems = Vec::new();

        if self.ingest_first {
            for report in self.ingestion.ingest_all().await {
                match report.status {
                    IngestStatus::UpToDate | IngestStatus::Complete => {}
                    IngestStatus::Partial | IngestStatus::Failed => problems.push(format!(
                        "{} ingestion {:?}: {}",
                        report.series,
                        report.status,
                        report.error.unwrap_or_default()
                    )),
                }
                if !report.rejected.is_empty() {
                    problems.push(format!("{} rejected {} records", report.series, report.rejected.len()));
                }
            }
        }

        let report = match self.recompute.run().await {
            Ok(report) => report,
            Err(e) => {
                return RunOutcome::Failed {
                    cause: e.to_string(),
                }
            }
        };
        if !report.artifacts_published {
            return RunOutcome::Failed {
                cause: format!("run {} published no artifacts", report.run_id),
            };
        }
        if !report.is_complete() {
            problems.push(format!("run {} has incomplete stages", report.run_id));
        }

        if problems.is_empty() {
            RunOutcome::Succeeded
        } else {
            RunOutcome::Partial {
                reason: problems.join("; "),
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub retry_backoff: Duration,
    pub max_retries: u32,
    pub run_at_startup: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            retry_backoff: Duration::from_secs(900),
            max_retries: 2,
            run_at_startup: true,
        }
    }
}

fn wall_clock() -> NaiveDateTime {
    Local::now().naive_local()
}

/// Single timer loop: read schedule, wait, run, repeat.
pub struct AnalyticsScheduler {
    config: SchedulerConfig,
    job: Arc<dyn ScheduledJob>,
    schedule: ScheduleSource,
    history: HistoryLog,
    cancel: CancellationToken,
}

impl AnalyticsScheduler {
    pub fn new(
        config: SchedulerConfig,
        job: Arc<dyn ScheduledJob>,
        schedule: ScheduleSource,
        history: HistoryLog,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            config,
            job,
            schedule,
            history,
            cancel,
        }
    }

    pub fn start(self) -> JoinHandle<()> {
        tokio::spawn(async move { self.run().await })
    }

    /// Runs until cancelled. A failed job never ends the loop.
    pub async fn run(self) {
        info!(schedule = %self.schedule.path().display(), "Analytics scheduler started");

        let mut startup_pending = self.config.run_at_startup;
        loop {
            // The target is fixed before any run, so a long startup run
            // cannot push today's scheduled run to tomorrow.
            let time_of_day = self.schedule.resolve(&self.history).await;
            let target = next_run_at(wall_clock(), time_of_day);
            self.history
                .append(HistoryEvent::Scheduled, &target.format("%Y-%m-%dT%H:%M:%S").to_string())
                .await;
            info!(next_run = %target, "Next analytics run scheduled");

            if std::mem::take(&mut startup_pending) && !self.run_with_retries("startup").await {
                break;
            }

            if !self.sleep_until(target).await {
                self.history.append(HistoryEvent::Cancelled, "shutdown").await;
                break;
            }

            if !self.run_with_retries("scheduled").await {
                break;
            }
        }

        info!("Analytics scheduler stopped");
    }

    /// Run the job, retrying failures while the retry precedes the next
    /// regular run. Returns false if cancelled while waiting to retry.
    async fn run_with_retries(&self, trigger: &str) -> bool {
        let mut outcome = self.execute(trigger).await;
        let mut attempt = 0;

        while outcome.is_failed() && attempt < self.config.max_retries {
            let now = wall_clock();
            let backoff = ChronoDuration::from_std(self.config.retry_backoff).unwrap_or(ChronoDuration::zero());
            let retry_at = now + backoff;
            let time_of_day = self.schedule.read().await.unwrap_or(self.schedule.default_time());
            let next_regular = next_run_at(now, time_of_day);
            if retry_at >= next_regular {
                info!(retry_at = %retry_at, next_regular = %next_regular, "Skipping retry, regular run comes first");
                break;
            }

            attempt += 1;
            self.history
                .append(
                    HistoryEvent::Retry,
                    &format!("attempt {} at {}", attempt, retry_at.format("%Y-%m-%dT%H:%M:%S")),
                )
                .await;
            warn!(attempt, backoff_secs = self.config.retry_backoff.as_secs(), "Retrying failed run");

            if !self.sleep_until(retry_at).await {
                self.history.append(HistoryEvent::Cancelled, "shutdown during retry wait").await;
                return false;
            }
            outcome = self.execute("retry").await;
        }
        true
    }

    async fn execute(&self, trigger: &str) -> RunOutcome {
        self.history.append(HistoryEvent::Started, trigger).await;
        let span = info_span!("analytics_run", trigger);
        let outcome = self.job.run().instrument(span).await;

        match &outcome {
            RunOutcome::Succeeded => {
                health().scheduler.set_healthy();
                info!(trigger, "Analytics run succeeded");
            }
            RunOutcome::Partial { reason } => {
                health().scheduler.set_healthy();
                warn!(trigger, reason = %reason, "Analytics run partially succeeded");
            }
            RunOutcome::Failed { cause } => {
                health().scheduler.set_unhealthy(cause.clone());
                error!(trigger, cause = %cause, "Analytics run failed");
            }
        }
        self.history.append(HistoryEvent::Finished, &outcome.to_string()).await;
        log_snapshot(&metrics().snapshot());
        outcome
    }

    /// Sleep until `target` on the wall clock. False if cancelled first.
    async fn sleep_until(&self, target: NaiveDateTime) -> bool {
        let wait = (target - wall_clock()).to_std().unwrap_or(Duration::ZERO);
        tokio::select! {
            _ = self.cancel.cancelled() => false,
            _ = tokio::time::sleep(wait) => true,
        }
    }
}

/// Parse the configured default time, falling back to 02:00.
pub fn default_time_of_day(raw: &str) -> NaiveTime {
    crate::schedule::parse_time_of_day(raw).unwrap_or_else(|e| {
        warn!(error = %e, "Invalid default schedule time, using 02:00");
        NaiveTime::from_hms_opt(2, 0, 0).unwrap_or_default()
    })
}
