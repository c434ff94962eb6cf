//! Watermark-driven fetch windows.

use chrono::NaiveDate;
use outage_core::{FetchWindow, OutageStore, Result, Series};
use std::sync::Arc;
use tracing::debug;

/// Derives the next fetch window from what is already persisted.
///
/// The watermark is never stored on its own; it is always read back from
/// the raw table, so a crash between pages simply resumes from there.
#[derive(Clone)]
pub struct WatermarkTracker {
    store: Arc<dyn OutageStore>,
    epoch: NaiveDate,
}

impl WatermarkTracker {
    pub fn new(store: Arc<dyn OutageStore>, epoch: NaiveDate) -> Self {
        Self { store, epoch }
    }

    pub fn epoch(&self) -> NaiveDate {
        self.epoch
    }

    pub async fn current(&self, series: Series) -> Result<Option<NaiveDate>> {
        self.store.watermark(series).await
    }

    /// Window from the day after the watermark (or the epoch) to `today`.
    pub async fn window(&self, series: Series, today: NaiveDate) -> Result<(Option<NaiveDate>, FetchWindow)> {
        let watermark = self.current(series).await?;
        let window = FetchWindow::after_watermark(watermark, self.epoch, today);
        debug!(series = %series, watermark = ?watermark, window = %window, "Computed fetch window");
        Ok((watermark, window))
    }
}
