//! Calendar seasons used to label periods in the cluster table.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Meteorological season of a period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CalendarSeason {
    Spring,
    Summer,
    Fall,
    Winter,
}

impl CalendarSeason {
    /// Mar-May spring, Jun-Aug summer, Sep-Nov fall, Dec-Feb winter.
    pub fn of(date: NaiveDate) -> Self {
        match date.month() {
            3..=5 => Self::Spring,
            6..=8 => Self::Summer,
            9..=11 => Self::Fall,
            _ => Self::Winter,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Spring => "Spring",
            Self::Summer => "Summer",
            Self::Fall => "Fall",
            Self::Winter => "Winter",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Spring" => Some(Self::Spring),
            "Summer" => Some(Self::Summer),
            "Fall" => Some(Self::Fall),
            "Winter" => Some(Self::Winter),
            _ => None,
        }
    }
}

impl fmt::Display for CalendarSeason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
