//! Feed configuration.

use chrono::NaiveDate;
use outage_core::limits::{default_epoch, DEFAULT_MAX_PAGES, DEFAULT_PAGE_SIZE};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// EIA v2 feed configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct FeedConfig {
    /// Base URL of the nuclear-outages API (series routes are joined onto it)
    #[validate(url)]
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// API key sent as the `api_key` query parameter
    #[serde(default)]
    pub api_key: Option<String>,
    /// Feed frequency. Windows and watermarks step by day, so only `daily`
    /// is accepted.
    #[validate(custom(function = "validate_frequency"))]
    #[serde(default = "default_frequency")]
    pub frequency: String,
    /// Records per page
    #[validate(range(min = 1, max = 5000))]
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// Upper bound on pages per fetch window
    #[validate(range(min = 1))]
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Lower fetch bound for a series with no persisted rows
    #[serde(default = "default_epoch")]
    pub epoch: NaiveDate,
}

fn default_base_url() -> String {
    "https://api.eia.gov/v2/nuclear-outages/".to_string()
}

fn default_frequency() -> String {
    "daily".to_string()
}

fn validate_frequency(frequency: &str) -> Result<(), ValidationError> {
    if frequency == "daily" {
        return Ok(());
    }
    let mut err = ValidationError::new("unsupported_frequency");
    err.message = Some(format!("frequency {:?} is not supported, use \"daily\"", frequency).into());
    Err(err)
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

fn default_max_pages() -> usize {
    DEFAULT_MAX_PAGES
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            frequency: default_frequency(),
            page_size: default_page_size(),
            max_pages: default_max_pages(),
            timeout_secs: default_timeout_secs(),
            epoch: default_epoch(),
        }
    }
}
