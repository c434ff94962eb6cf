//! Fetch windows derived from the persisted watermark.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Inclusive `[start, end]` date range requested from the feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl FetchWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Window starting one day after `watermark`, or at `epoch` when the
    /// series has nothing persisted yet.
    pub fn after_watermark(watermark: Option<NaiveDate>, epoch: NaiveDate, end: NaiveDate) -> Self {
        let start = match watermark {
            Some(latest) => latest.checked_add_days(Days::new(1)).unwrap_or(latest),
            None => epoch,
        };
        Self { start, end }
    }

    /// True when there is nothing to fetch.
    pub fn is_empty(&self) -> bool {
        self.start > self.end
    }

    /// Feed query value for the lower bound.
    pub fn start_param(&self) -> String {
        self.start.format("%Y-%m-%d").to_string()
    }

    /// Feed query value for the upper bound.
    pub fn end_param(&self) -> String {
        self.end.format("%Y-%m-%d").to_string()
    }
}

impl fmt::Display for FetchWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", self.start, self.end)
    }
}
