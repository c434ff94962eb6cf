//! Time-of-day schedule file and scheduling history log.

use chrono::{Duration, Local, NaiveDateTime, NaiveTime, SecondsFormat};
use outage_core::{Error, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// Parse a strict `HH:MM` time of day.
pub fn parse_time_of_day(raw: &str) -> Result<NaiveTime> {
    let trimmed = raw.trim();
    let valid_shape = trimmed.len() == 5 && trimmed.as_bytes()[2] == b':';
    if !valid_shape {
        return Err(Error::config(format!("expected HH:MM, got {:?}", trimmed)));
    }
    NaiveTime::parse_from_str(trimmed, "%H:%M")
        .map_err(|e| Error::config(format!("invalid time of day {:?}: {}", trimmed, e)))
}

/// Next instant at `time_of_day` strictly after `now`.
///
/// Today if that time is still ahead, otherwise tomorrow. Computed fresh
/// each cycle from the wall clock, so runs never drift.
pub fn next_run_at(now: NaiveDateTime, time_of_day: NaiveTime) -> NaiveDateTime {
    let today = now.date().and_time(time_of_day);
    if today > now {
        today
    } else {
        today + Duration::days(1)
    }
}

/// The schedule file: a single `HH:MM` line.
#[derive(Debug, Clone)]
pub struct ScheduleSource {
    path: PathBuf,
    default_time: NaiveTime,
}

impl ScheduleSource {
    pub fn new(path: impl Into<PathBuf>, default_time: NaiveTime) -> Self {
        Self {
            path: path.into(),
            default_time,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn default_time(&self) -> NaiveTime {
        self.default_time
    }

    pub async fn read(&self) -> Result<NaiveTime> {
        let body = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| Error::config(format!("read {}: {}", self.path.display(), e)))?;
        let line = body.lines().find(|l| !l.trim().is_empty()).unwrap_or("");
        parse_time_of_day(line)
    }

    /// Configured time, or the default with the fallback written to `history`.
    pub async fn resolve(&self, history: &HistoryLog) -> NaiveTime {
        match self.read().await {
            Ok(time) => {
                debug!(time = %time.format("%H:%M"), "Schedule file read");
                time
            }
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    default = %self.default_time.format("%H:%M"),
                    "Schedule unreadable, using default time"
                );
                history
                    .append(
                        HistoryEvent::Fallback,
                        &format!("{} ({})", self.default_time.format("%H:%M"), e),
                    )
                    .await;
                self.default_time
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryEvent {
    Scheduled,
    Fallback,
    Started,
    Finished,
    Retry,
    Cancelled,
}

impl HistoryEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Fallback => "fallback",
            Self::Started => "started",
            Self::Finished => "finished",
            Self::Retry => "retry",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for HistoryEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Append-only plaintext log: `<RFC 3339 timestamp> <event> <detail>`.
#[derive(Debug, Clone)]
pub struct HistoryLog {
    path: PathBuf,
}

impl HistoryLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one line. Failures are logged and swallowed.
    pub async fn append(&self, event: HistoryEvent, detail: &str) {
        let line = format!(
            "{} {} {}\n",
            Local::now().to_rfc3339_opts(SecondsFormat::Secs, false),
            event,
            detail.replace('\n', " ")
        );
        if let Err(e) = self.write_line(&line).await {
            warn!(path = %self.path.display(), error = %e, "Failed to append scheduler history");
        }
    }

    async fn write_line(&self, line: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await
    }
}
