//! Unified error types for the outage pipeline.
//!
//! Error codes:
//! - FETCH_001: Transient feed failure (non-2xx, network, malformed page)
//! - VALID_001: Record missing a required field
//! - DB_001: Storage unavailable
//! - CONFIG_001: Schedule/config file unreadable or malformed
//! - DATA_001-002: Analytics stage could not run
//! - ARTIFACT_001: Artifact file could not be written

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for the outage pipeline.
#[derive(Debug, Error)]
pub enum Error {
    /// Feed call failed; the page loop stops and keeps what it already has.
    #[error("[FETCH_001] {message}")]
    TransientFetch {
        message: String,
        status: Option<u16>,
    },

    /// A single record is missing a required field.
    #[error("[VALID_001] missing required field: {field}")]
    RecordValidation { field: String },

    /// Storage could not be reached, queried, or written.
    #[error("[DB_001] {0}")]
    StorageUnavailable(String),

    /// Schedule or configuration file could not be read.
    #[error("[CONFIG_001] {0}")]
    ConfigRead(String),

    /// Not enough observations to run an analytics stage.
    #[error("[DATA_001] insufficient data: need at least {required}, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    /// An analytics stage rejected its input.
    #[error("[DATA_002] {0}")]
    Analytics(String),

    /// Artifact file I/O failed.
    #[error("[ARTIFACT_001] {0}")]
    Artifact(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn transient_fetch(msg: impl Into<String>) -> Self {
        Self::TransientFetch {
            message: msg.into(),
            status: None,
        }
    }

    /// Create a fetch error carrying the HTTP status returned by the feed.
    pub fn http_status(status: u16, msg: impl Into<String>) -> Self {
        Self::TransientFetch {
            message: msg.into(),
            status: Some(status),
        }
    }

    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::RecordValidation {
            field: field.into(),
        }
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::StorageUnavailable(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigRead(msg.into())
    }

    pub fn insufficient(required: usize, actual: usize) -> Self {
        Self::InsufficientData { required, actual }
    }

    pub fn analytics(msg: impl Into<String>) -> Self {
        Self::Analytics(msg.into())
    }

    pub fn artifact(msg: impl Into<String>) -> Self {
        Self::Artifact(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Get the stable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::TransientFetch { .. } => "FETCH_001",
            Self::RecordValidation { .. } => "VALID_001",
            Self::StorageUnavailable(_) => "DB_001",
            Self::ConfigRead(_) => "CONFIG_001",
            Self::InsufficientData { .. } => "DATA_001",
            Self::Analytics(_) => "DATA_002",
            Self::Artifact(_) => "ARTIFACT_001",
            Self::Serialization(_) => "SERDE_001",
            Self::Internal(_) => "INTERNAL_001",
        }
    }

    /// Whether the next scheduled run can be expected to succeed without
    /// operator action.
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            Self::TransientFetch { .. } | Self::StorageUnavailable(_) | Self::Artifact(_)
        )
    }

    /// Get the HTTP status code used by the job-trigger API.
    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::TransientFetch { .. } => 502,
            Self::RecordValidation { .. } => 400,
            Self::StorageUnavailable(_) => 503,
            Self::ConfigRead(_) => 500,
            Self::InsufficientData { .. } => 422,
            Self::Analytics(_) => 422,
            Self::Artifact(_) => 500,
            Self::Serialization(_) => 500,
            Self::Internal(_) => 500,
        }
    }
}
