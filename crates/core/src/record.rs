//! Outage record definitions.
//!
//! `FeedRecord` is the raw shape served by the EIA v2 API (camelCase and
//! dashed field names, numbers sometimes encoded as strings). `OutageRecord`
//! is the validated shape persisted to storage.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use validator::Validate;

use crate::error::{Error, Result};

/// One logical dataset published by the feed, persisted to its own table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Series {
    National,
    Facility,
    Generator,
}

impl Series {
    pub const ALL: [Series; 3] = [Series::National, Series::Facility, Series::Generator];

    /// Storage table name.
    pub fn table(&self) -> &'static str {
        match self {
            Self::National => "national_outages",
            Self::Facility => "facility_outages",
            Self::Generator => "generator_outages",
        }
    }

    /// Feed route under the nuclear-outages API.
    pub fn route(&self) -> &'static str {
        match self {
            Self::National => "us-nuclear-outages",
            Self::Facility => "facility-nuclear-outages",
            Self::Generator => "generator-nuclear-outages",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::National => "national",
            Self::Facility => "facility",
            Self::Generator => "generator",
        }
    }

    fn requires_facility(&self) -> bool {
        matches!(self, Self::Facility | Self::Generator)
    }

    fn requires_generator(&self) -> bool {
        matches!(self, Self::Generator)
    }
}

impl fmt::Display for Series {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Series {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "national" | "national_outages" => Ok(Self::National),
            "facility" | "facility_outages" => Ok(Self::Facility),
            "generator" | "generator_outages" => Ok(Self::Generator),
            other => Err(Error::config(format!("unknown series: {}", other))),
        }
    }
}

/// Raw record as served by the feed.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct FeedRecord {
    #[validate(required, length(min = 1))]
    pub period: Option<String>,

    #[serde(default, deserialize_with = "flexible_f64")]
    pub capacity: Option<f64>,
    #[serde(default, deserialize_with = "flexible_f64")]
    pub outage: Option<f64>,
    #[serde(default, rename = "percentOutage", deserialize_with = "flexible_f64")]
    pub percent_outage: Option<f64>,

    #[serde(default, rename = "capacity-units", deserialize_with = "flexible_string")]
    pub capacity_units: Option<String>,
    #[serde(default, rename = "outage-units", deserialize_with = "flexible_string")]
    pub outage_units: Option<String>,
    #[serde(default, rename = "percentOutage-units", deserialize_with = "flexible_string")]
    pub percent_outage_units: Option<String>,

    #[serde(default, rename = "facility", deserialize_with = "flexible_string")]
    pub facility_id: Option<String>,
    #[serde(default, rename = "facilityName", deserialize_with = "flexible_string")]
    pub facility_name: Option<String>,
    #[serde(default, rename = "generator", deserialize_with = "flexible_string")]
    pub generator_id: Option<String>,
}

impl FeedRecord {
    /// Validate required fields for `series` and convert to a storable record.
    pub fn into_record(self, series: Series) -> Result<OutageRecord> {
        if let Err(errors) = self.validate() {
            let field = errors
                .field_errors()
                .keys()
                .next()
                .map(|k| k.to_string())
                .unwrap_or_else(|| "period".to_string());
            return Err(Error::missing_field(field));
        }

        let raw_period = self.period.unwrap_or_default();
        let period = parse_period(&raw_period)
            .ok_or_else(|| Error::missing_field(format!("period (unparseable: {:?})", raw_period)))?;

        let facility_id = non_empty(self.facility_id);
        let generator_id = non_empty(self.generator_id);

        if series.requires_facility() && facility_id.is_none() {
            return Err(Error::missing_field("facility"));
        }
        if series.requires_generator() && generator_id.is_none() {
            return Err(Error::missing_field("generator"));
        }

        Ok(OutageRecord {
            period,
            capacity: self.capacity,
            outage: self.outage,
            percent_outage: self.percent_outage,
            capacity_units: self.capacity_units,
            outage_units: self.outage_units,
            percent_outage_units: self.percent_outage_units,
            facility_id,
            facility_name: self.facility_name,
            generator_id,
        })
    }
}

/// Validated outage record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutageRecord {
    pub period: NaiveDate,
    pub capacity: Option<f64>,
    pub outage: Option<f64>,
    pub percent_outage: Option<f64>,
    pub capacity_units: Option<String>,
    pub outage_units: Option<String>,
    pub percent_outage_units: Option<String>,
    pub facility_id: Option<String>,
    pub facility_name: Option<String>,
    pub generator_id: Option<String>,
}

impl OutageRecord {
    /// A national-level record with only the period and percent outage set.
    pub fn national(period: NaiveDate, percent_outage: Option<f64>) -> Self {
        Self {
            period,
            capacity: None,
            outage: None,
            percent_outage,
            capacity_units: None,
            outage_units: None,
            percent_outage_units: None,
            facility_id: None,
            facility_name: None,
            generator_id: None,
        }
    }

    /// Identity key used for uniqueness in storage.
    pub fn key(&self) -> RecordKey {
        RecordKey {
            period: self.period,
            facility_id: self.facility_id.clone().unwrap_or_default(),
            generator_id: self.generator_id.clone().unwrap_or_default(),
        }
    }
}

/// `(period, facility_id, generator_id)` with absent identifiers as "".
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordKey {
    pub period: NaiveDate,
    pub facility_id: String,
    pub generator_id: String,
}

/// Parse a feed period (`YYYY-MM-DD` or `YYYY-MM`).
pub fn parse_period(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(&format!("{}-01", raw), "%Y-%m-%d"))
        .ok()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Accepts numbers, numeric strings, empty strings, and null.
fn flexible_f64<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    })
}

/// Optional text fields are strings in the feed but occasionally numeric.
/// Any other shape reads as absent.
fn flexible_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}
