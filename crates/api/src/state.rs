//! Application state shared across handlers.

use outage_core::OutageStore;
use std::sync::Arc;
use worker::{IngestionWorker, RecomputeJob};

#[derive(Clone)]
pub struct AppState {
    pub ingestion: IngestionWorker,
    pub recompute: RecomputeJob,
    /// Store (ClickHouse in production, in-memory in tests)
    pub store: Arc<dyn OutageStore>,
}

impl AppState {
    pub fn new(ingestion: IngestionWorker, recompute: RecomputeJob, store: Arc<dyn OutageStore>) -> Self {
        Self {
            ingestion,
            recompute,
            store,
        }
    }
}
