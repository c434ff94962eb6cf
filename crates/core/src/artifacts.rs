//! Derived artifact types produced by the recompute job.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::season::CalendarSeason;

/// Human-readable severity of a cluster, ordered by ascending centroid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SeverityLevel {
    #[serde(rename = "Very low")]
    VeryLow,
    Low,
    Medium,
    High,
}

impl SeverityLevel {
    /// All levels, lowest first.
    pub const ALL: [SeverityLevel; 4] = [
        SeverityLevel::VeryLow,
        SeverityLevel::Low,
        SeverityLevel::Medium,
        SeverityLevel::High,
    ];

    /// Level for a centroid rank (0 = lowest centroid).
    pub fn from_rank(rank: usize) -> Option<Self> {
        Self::ALL.get(rank).copied()
    }

    pub fn rank(&self) -> usize {
        *self as usize
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::VeryLow => "Very low",
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|level| level.name() == s)
    }
}

impl fmt::Display for SeverityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One point of a multiplicative decomposition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DecompositionPoint {
    pub period: NaiveDate,
    pub trend: f64,
    pub seasonal: f64,
}

/// Trend and seasonal components aligned to input order, edges dropped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DecompositionResult {
    pub points: Vec<DecompositionPoint>,
}

impl DecompositionResult {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn trend(&self) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
        self.points.iter().map(|p| (p.period, p.trend))
    }

    pub fn seasonal(&self) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
        self.points.iter().map(|p| (p.period, p.seasonal))
    }
}

/// Cluster membership of one observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClusterAssignment {
    pub period: NaiveDate,
    pub percent_outage: f64,
    /// Centroid rank within this run, 0 = lowest.
    pub cluster_label: usize,
    pub severity: SeverityLevel,
}

/// One row of the published cluster table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterRow {
    pub period: NaiveDate,
    pub percent_outage: f64,
    /// Absent where the decomposition dropped the edge.
    pub trend: Option<f64>,
    pub seasonal: Option<f64>,
    pub cluster: usize,
    pub cluster_name: SeverityLevel,
    pub calendar_season: CalendarSeason,
}

/// Per-year count of observations in each severity level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonCount {
    pub year: i32,
    /// Indexed by `SeverityLevel::rank()`.
    pub counts: [u64; 4],
}

impl SeasonCount {
    pub fn new(year: i32) -> Self {
        Self {
            year,
            counts: [0; 4],
        }
    }

    pub fn get(&self, level: SeverityLevel) -> u64 {
        self.counts[level.rank()]
    }

    pub fn increment(&mut self, level: SeverityLevel) {
        self.counts[level.rank()] += 1;
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }
}

/// One observed point of the forecast history.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistoryPoint {
    pub date: NaiveDate,
    pub percent_outage: f64,
}

/// One-step-ahead forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResult {
    pub predicted_date: NaiveDate,
    pub predicted_percent_outage: f64,
    pub history: Vec<HistoryPoint>,
}

/// Forecast stage outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ForecastOutcome {
    Ready(ForecastResult),
    InsufficientData { required: usize, actual: usize },
}

impl ForecastOutcome {
    pub fn result(&self) -> Option<&ForecastResult> {
        match self {
            Self::Ready(result) => Some(result),
            Self::InsufficientData { .. } => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }
}
