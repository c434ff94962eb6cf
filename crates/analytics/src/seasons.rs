//! Published tables derived from cluster assignments.

use chrono::{Datelike, NaiveDate};
use outage_core::{CalendarSeason, ClusterAssignment, ClusterRow, DecompositionResult, SeasonCount};
use std::collections::{BTreeMap, HashMap};

/// Per-year counts of each severity level, ascending by year.
pub fn season_counts(assignments: &[ClusterAssignment]) -> Vec<SeasonCount> {
    let mut years: BTreeMap<i32, SeasonCount> = BTreeMap::new();
    for a in assignments {
        let year = a.period.year();
        years
            .entry(year)
            .or_insert_with(|| SeasonCount::new(year))
            .increment(a.severity);
    }
    years.into_values().collect()
}

/// Join assignments with decomposition columns by period.
///
/// Trend and seasonal stay `None` where the decomposition dropped the edge
/// or did not run.
pub fn cluster_rows(
    assignments: &[ClusterAssignment],
    decomposition: Option<&DecompositionResult>,
) -> Vec<ClusterRow> {
    let components: HashMap<NaiveDate, (f64, f64)> = decomposition
        .map(|d| d.points.iter().map(|p| (p.period, (p.trend, p.seasonal))).collect())
        .unwrap_or_default();

    assignments
        .iter()
        .map(|a| {
            let parts = components.get(&a.period);
            ClusterRow {
                period: a.period,
                percent_outage: a.percent_outage,
                trend: parts.map(|p| p.0),
                seasonal: parts.map(|p| p.1),
                cluster: a.cluster_label,
                cluster_name: a.severity,
                calendar_season: CalendarSeason::of(a.period),
            }
        })
        .collect()
}
