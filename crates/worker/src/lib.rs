//! Workers for the outage pipeline.
//!
//! - Ingestion (watermark → paginated fetch → loader)
//! - Recompute (decomposition, clustering, forecast → artifacts)
//! - Scheduler (time-of-day timer driving ingestion + recompute)

pub mod artifacts;
pub mod config;
pub mod ingestion;
pub mod loader;
pub mod recompute;
pub mod schedule;
pub mod scheduler;
pub mod watermark;

pub use artifacts::ArtifactStore;
pub use config::AnalyticsConfig;
pub use ingestion::{IngestReport, IngestStatus, IngestionWorker};
pub use loader::{LoadReport, Loader, RecordFailure};
pub use recompute::{RecomputeJob, RecomputeReport, StageStatus};
pub use schedule::{next_run_at, parse_time_of_day, HistoryEvent, HistoryLog, ScheduleSource};
pub use scheduler::*;
pub use watermark::WatermarkTracker;
