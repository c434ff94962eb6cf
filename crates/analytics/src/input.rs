//! Extraction of analytics inputs from persisted records.

use chrono::NaiveDate;
use outage_core::OutageRecord;

/// `(period, percent_outage)`
pub type Observation = (NaiveDate, f64);

/// One row usable by the forecast.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForecastRow {
    pub period: NaiveDate,
    pub outage: f64,
    pub percent_outage: f64,
}

/// Rows with a known, finite `percent_outage`. Unknown is not zero.
pub fn percent_series(records: &[OutageRecord]) -> Vec<Observation> {
    records
        .iter()
        .filter_map(|r| r.percent_outage.filter(|v| v.is_finite()).map(|v| (r.period, v)))
        .collect()
}

/// Rows with both `outage` and `percent_outage` known.
pub fn forecast_rows(records: &[OutageRecord]) -> Vec<ForecastRow> {
    records
        .iter()
        .filter_map(|r| match (r.outage, r.percent_outage) {
            (Some(outage), Some(percent_outage)) if outage.is_finite() && percent_outage.is_finite() => {
                Some(ForecastRow {
                    period: r.period,
                    outage,
                    percent_outage,
                })
            }
            _ => None,
        })
        .collect()
}
