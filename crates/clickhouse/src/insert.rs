//! Row mapping and batch inserts.

use crate::client::ClickHouseClient;
use chrono::{Duration, NaiveDate};
use clickhouse::Row;
use outage_core::{Error, OutageRecord, Result, Series};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use telemetry::metrics;
use tracing::debug;

fn unix_epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default()
}

/// ClickHouse `Date` is days since 1970-01-01 as `UInt16`.
pub fn date_to_days(date: NaiveDate) -> Result<u16> {
    let days = (date - unix_epoch()).num_days();
    u16::try_from(days).map_err(|_| Error::storage(format!("period {} outside Date range", date)))
}

pub fn days_to_date(days: u16) -> NaiveDate {
    unix_epoch() + Duration::days(i64::from(days))
}

/// One stored outage row. Column order matches the table DDL prefix.
#[derive(Debug, Clone, PartialEq, Row, Serialize, Deserialize)]
pub struct OutageRow {
    pub period: u16,
    pub facility_id: String,
    pub generator_id: String,
    pub facility_name: Option<String>,
    pub capacity: Option<f64>,
    pub outage: Option<f64>,
    pub percent_outage: Option<f64>,
    pub capacity_units: Option<String>,
    pub outage_units: Option<String>,
    pub percent_outage_units: Option<String>,
}

/// Column list used by both inserts and reads.
pub const OUTAGE_COLUMNS: &str = "period, facility_id, generator_id, facility_name, capacity, outage, \
     percent_outage, capacity_units, outage_units, percent_outage_units";

impl OutageRow {
    pub fn from_record(record: OutageRecord) -> Result<Self> {
        Ok(Self {
            period: date_to_days(record.period)?,
            facility_id: record.facility_id.unwrap_or_default(),
            generator_id: record.generator_id.unwrap_or_default(),
            facility_name: record.facility_name,
            capacity: record.capacity,
            outage: record.outage,
            percent_outage: record.percent_outage,
            capacity_units: record.capacity_units,
            outage_units: record.outage_units,
            percent_outage_units: record.percent_outage_units,
        })
    }

    pub fn into_record(self) -> OutageRecord {
        OutageRecord {
            period: days_to_date(self.period),
            capacity: self.capacity,
            outage: self.outage,
            percent_outage: self.percent_outage,
            capacity_units: self.capacity_units,
            outage_units: self.outage_units,
            percent_outage_units: self.percent_outage_units,
            facility_id: Some(self.facility_id).filter(|s| !s.is_empty()),
            facility_name: self.facility_name,
            generator_id: Some(self.generator_id).filter(|s| !s.is_empty()),
        }
    }
}

/// Write `records` as one insert block. Returns the number of rows written.
pub async fn insert_records(
    client: &ClickHouseClient,
    series: Series,
    records: Vec<OutageRecord>,
) -> Result<usize> {
    if records.is_empty() {
        return Ok(0);
    }

    let rows = records
        .into_iter()
        .map(OutageRow::from_record)
        .collect::<Result<Vec<_>>>()?;
    let count = rows.len();
    let start = Instant::now();

    let mut insert = client
        .inner()
        .insert::<OutageRow>(series.table())
        .map_err(|e| Error::storage(format!("insert into {}: {}", series.table(), e)))?;

    for row in &rows {
        insert
            .write(row)
            .await
            .map_err(|e| Error::storage(format!("write row: {}", e)))?;
    }

    client.timed("commit insert", insert.end()).await?;

    metrics().insert_latency_ms.observe(start.elapsed().as_millis() as u64);
    debug!(series = %series, rows = count, "Inserted batch");
    Ok(count)
}
