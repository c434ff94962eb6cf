//! Ingestion cycle: watermark → paginated fetch → load, per series.

use chrono::{NaiveDate, Utc};
use feed::PaginatedFetcher;
use outage_core::{FetchWindow, Series};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::loader::{Loader, RecordFailure};
use crate::watermark::WatermarkTracker;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestStatus {
    /// Window was empty; the feed was not called.
    UpToDate,
    Complete,
    /// The feed failed mid-window; nothing from the window was committed.
    Partial,
    /// Storage failed; the cycle for this series stopped.
    Failed,
}

/// What one ingestion cycle did for one series.
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub series: Series,
    pub status: IngestStatus,
    pub window: Option<FetchWindow>,
    pub watermark_before: Option<NaiveDate>,
    pub watermark_after: Option<NaiveDate>,
    pub calls: usize,
    pub pages: usize,
    /// Records fetched but held back because the window did not finish.
    pub uncommitted: usize,
    pub inserted: usize,
    pub duplicates: usize,
    pub rejected: Vec<RecordFailure>,
    pub error: Option<String>,
}

impl IngestReport {
    fn new(series: Series) -> Self {
        Self {
            series,
            status: IngestStatus::Complete,
            window: None,
            watermark_before: None,
            watermark_after: None,
            calls: 0,
            pages: 0,
            uncommitted: 0,
            inserted: 0,
            duplicates: 0,
            rejected: Vec::new(),
            error: None,
        }
    }

    fn fail(mut self, error: impl ToString) -> Self {
        self.status = IngestStatus::Failed;
        self.error = Some(error.to_string());
        self
    }

    pub fn is_ok(&self) -> bool {
        matches!(self.status, IngestStatus::UpToDate | IngestStatus::Complete)
    }
}

/// Runs ingestion cycles. Cheap to clone.
#[derive(Clone)]
pub struct IngestionWorker {
    fetcher: PaginatedFetcher,
    tracker: WatermarkTracker,
    loader: Loader,
}

impl IngestionWorker {
    pub fn new(fetcher: PaginatedFetcher, tracker: WatermarkTracker, loader: Loader) -> Self {
        Self {
            fetcher,
            tracker,
            loader,
        }
    }

    /// Ingest up to today's UTC date.
    pub async fn ingest(&self, series: Series) -> IngestReport {
        self.ingest_until(series, Utc::now().date_naive()).await
    }

    /// Ingest every series in order.
    pub async fn ingest_all(&self) -> Vec<IngestReport> {
        let today = Utc::now().date_naive();
        let mut reports = Vec::with_capacity(Series::ALL.len());
        for series in Series::ALL {
            reports.push(self.ingest_until(series, today).await);
        }
        reports
    }

    /// One cycle with `end` as the inclusive upper bound.
    ///
    /// Never returns an error: failures are reported in the status so the
    /// caller can decide what the run as a whole amounts to.
    pub async fn ingest_until(&self, series: Series, end: NaiveDate) -> IngestReport {
        let mut report = IngestReport::new(series);

        let (watermark, window) = match self.tracker.window(series, end).await {
            Ok(found) => found,
            Err(e) => {
                error!(series = %series, error = %e, "Watermark query failed");
                return report.fail(e);
            }
        };
        report.watermark_before = watermark;
        report.watermark_after = watermark;

        if window.is_empty() {
            info!(series = %series, watermark = ?watermark, "Series up to date");
            report.status = IngestStatus::UpToDate;
            return report;
        }
        report.window = Some(window);

        // Pages arrive newest first. Committing any of them before the window
        // is exhausted would move the watermark past periods not yet fetched.
        let outcome = self.fetcher.fetch_all(series, window).await;
        report.calls = outcome.calls;
        report.pages = outcome.pages.len();

        if let Some(ref e) = outcome.error {
            report.uncommitted = outcome.record_count();
            warn!(
                series = %series,
                error = %e,
                pages = report.pages,
                uncommitted = report.uncommitted,
                "Fetch stopped early, window left for the next run"
            );
            report.status = IngestStatus::Partial;
            report.error = Some(e.to_string());
            return report;
        }

        // Oldest page first, so a storage failure part way leaves no gap
        // below the watermark.
        for page in outcome.pages.iter().rev() {
            match self.loader.load(series, &page.records).await {
                Ok(loaded) => {
                    report.inserted += loaded.inserted;
                    report.duplicates += loaded.duplicates;
                    report.rejected.extend(loaded.rejected);
                }
                Err(e) => {
                    error!(series = %series, offset = page.offset, error = %e, "Load failed");
                    return report.fail(e);
                }
            }
        }

        match self.tracker.current(series).await {
            Ok(after) => report.watermark_after = after,
            Err(e) => return report.fail(e),
        }

        info!(
            series = %series,
            window = %window,
            status = ?report.status,
            calls = report.calls,
            inserted = report.inserted,
            duplicates = report.duplicates,
            rejected = report.rejected.len(),
            watermark = ?report.watermark_after,
            "Ingestion cycle finished"
        );
        report
    }
}
