//! Worker configuration.

use outage_core::limits::DEFAULT_SCHEDULE_TIME;
use outage_core::Series;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Recompute and scheduling settings (`[analytics]` section).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    /// Directory holding the published CSV artifacts
    #[serde(default = "default_artifact_dir")]
    pub artifact_dir: PathBuf,
    /// File with a single `HH:MM` line, re-read every cycle
    #[serde(default = "default_schedule_file")]
    pub schedule_file: PathBuf,
    /// Append-only scheduling history
    #[serde(default = "default_history_log")]
    pub history_log: PathBuf,
    /// Used when the schedule file is missing or malformed
    #[serde(default = "default_time")]
    pub default_time: String,
    /// Series the recompute job reads
    #[serde(default = "default_series")]
    pub series: Series,
    #[serde(default = "default_retry_backoff_secs")]
    pub retry_backoff_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_true")]
    pub ingest_before_recompute: bool,
    #[serde(default = "default_true")]
    pub run_at_startup: bool,
}

fn default_artifact_dir() -> PathBuf {
    PathBuf::from("artifacts")
}

fn default_schedule_file() -> PathBuf {
    PathBuf::from("config/schedule.txt")
}

fn default_history_log() -> PathBuf {
    PathBuf::from("logs/scheduler_history.log")
}

fn default_time() -> String {
    DEFAULT_SCHEDULE_TIME.to_string()
}

fn default_series() -> Series {
    Series::National
}

fn default_retry_backoff_secs() -> u64 {
    900
}

fn default_max_retries() -> u32 {
    2
}

fn default_true() -> bool {
    true
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            artifact_dir: default_artifact_dir(),
            schedule_file: default_schedule_file(),
            history_log: default_history_log(),
            default_time: default_time(),
            series: default_series(),
            retry_backoff_secs: default_retry_backoff_secs(),
            max_retries: default_max_retries(),
            ingest_before_recompute: true,
            run_at_startup: true,
        }
    }
}

impl AnalyticsConfig {
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_secs(self.retry_backoff_secs)
    }
}
