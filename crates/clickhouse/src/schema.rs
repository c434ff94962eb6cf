//! ClickHouse table schemas.
//!
//! All three series share one column set. National rows carry empty
//! facility/generator identifiers so the sort key is uniform.
//!
//! - `ReplacingMergeTree` ordered by the identity key collapses duplicates
//! - `Date` for daily periods
//! - `Nullable(Float64)` so absent numbers stay unknown

use outage_core::Series;

const CREATE_OUTAGE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS {table} (
    period Date,
    facility_id String DEFAULT '',
    generator_id String DEFAULT '',
    facility_name Nullable(String),

    capacity Nullable(Float64),
    outage Nullable(Float64),
    percent_outage Nullable(Float64),

    capacity_units Nullable(String),
    outage_units Nullable(String),
    percent_outage_units Nullable(String),

    loaded_at DateTime DEFAULT now()
)
ENGINE = ReplacingMergeTree(loaded_at)
PARTITION BY toYear(period)
ORDER BY (period, facility_id, generator_id)
SETTINGS index_granularity = 8192
"#;

pub fn create_database(database: &str) -> String {
    format!("CREATE DATABASE IF NOT EXISTS {}", database)
}

pub fn create_table(database: &str, series: Series) -> String {
    CREATE_OUTAGE_TABLE.replace("{table}", &format!("{}.{}", database, series.table()))
}
