//! Read queries. All reads use `FINAL` so collapsed duplicates never show.

use crate::client::ClickHouseClient;
use crate::insert::{days_to_date, OutageRow, OUTAGE_COLUMNS};
use chrono::NaiveDate;
use clickhouse::Row;
use outage_core::{OutageRecord, RecordKey, Result, Series};
use serde::Deserialize;
use std::collections::HashSet;

#[derive(Debug, Row, Deserialize)]
struct WatermarkRow {
    rows: u64,
    latest: u16,
}

#[derive(Debug, Row, Deserialize)]
struct KeyRow {
    period: u16,
    facility_id: String,
    generator_id: String,
}

/// Latest persisted period, `None` for an empty table.
pub async fn watermark(client: &ClickHouseClient, series: Series) -> Result<Option<NaiveDate>> {
    let sql = format!(
        "SELECT count() AS rows, max(period) AS latest FROM {} FINAL",
        client.table(series)
    );
    let row: WatermarkRow = client
        .timed("watermark query", client.inner().query(&sql).fetch_one())
        .await?;

    Ok((row.rows > 0).then(|| days_to_date(row.latest)))
}

/// Identity keys already stored with a period in `[from, to]`.
pub async fn existing_keys(
    client: &ClickHouseClient,
    series: Series,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<HashSet<RecordKey>> {
    let sql = format!(
        "SELECT period, facility_id, generator_id FROM {} FINAL \
         WHERE period >= toDate(?) AND period <= toDate(?)",
        client.table(series)
    );
    let rows: Vec<KeyRow> = client
        .timed(
            "existing key query",
            client
                .inner()
                .query(&sql)
                .bind(from.format("%Y-%m-%d").to_string())
                .bind(to.format("%Y-%m-%d").to_string())
                .fetch_all(),
        )
        .await?;

    Ok(rows
        .into_iter()
        .map(|r| RecordKey {
            period: days_to_date(r.period),
            facility_id: r.facility_id,
            generator_id: r.generator_id,
        })
        .collect())
}

/// Every row of a series, ascending by period.
pub async fn load_series(client: &ClickHouseClient, series: Series) -> Result<Vec<OutageRecord>> {
    let sql = format!(
        "SELECT {} FROM {} FINAL ORDER BY period, facility_id, generator_id",
        OUTAGE_COLUMNS,
        client.table(series)
    );
    let rows: Vec<OutageRow> = client
        .timed("series query", client.inner().query(&sql).fetch_all())
        .await?;

    Ok(rows.into_iter().map(OutageRow::into_record).collect())
}

/// Distinct stored rows.
pub async fn count_rows(client: &ClickHouseClient, series: Series) -> Result<u64> {
    let sql = format!("SELECT count() FROM {} FINAL", client.table(series));
    client
        .timed("count query", client.inner().query(&sql).fetch_one::<u64>())
        .await
}

/// Truncate one series (test cleanup).
pub async fn truncate_series(client: &ClickHouseClient, series: Series) -> Result<()> {
    let sql = format!("TRUNCATE TABLE IF EXISTS {}", client.table(series));
    client
        .timed("truncate", client.inner().query(&sql).execute())
        .await
}
