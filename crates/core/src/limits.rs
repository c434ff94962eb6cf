//! Fixed limits and defaults for the outage pipeline.
//!
//! The `#[validate]` derive macro requires literal values in attributes,
//! so `MAX_PAGE_SIZE` is duplicated on `FeedConfig`. Keep both in sync.

use chrono::NaiveDate;

// === Feed ===

/// Records requested per page.
pub const DEFAULT_PAGE_SIZE: usize = 5000;

/// Largest page the EIA v2 API will serve.
pub const MAX_PAGE_SIZE: usize = 5000;

/// Upper bound on pages per fetch window, in case the feed never returns a short page.
pub const DEFAULT_MAX_PAGES: usize = 1000;

/// Lower fetch bound for a series with no persisted rows.
pub fn default_epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or_default()
}

// === Analytics ===

/// Seasonal period used by the decomposition (monthly seasonality assumption).
pub const SEASONAL_PERIOD: usize = 12;

/// Number of severity clusters.
pub const CLUSTER_COUNT: usize = 4;

/// Seed for the k-means initialisation.
pub const CLUSTER_SEED: u64 = 42;

/// Rolling window for the forecast features.
pub const ROLLING_WINDOW: usize = 7;

// === Scheduling ===

/// Time of day used when the schedule file cannot be read.
pub const DEFAULT_SCHEDULE_TIME: &str = "02:00";
