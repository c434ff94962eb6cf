//! In-process pipeline metrics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

/// A monotonically increasing counter.
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_by(&self, n: u64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// A value that can be overwritten.
#[derive(Debug, Default)]
pub struct Gauge(AtomicU64);

impl Gauge {
    pub fn set(&self, val: u64) {
        self.0.store(val, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Latency histogram in milliseconds.
///
/// Bucket bounds run from 10ms (a single page) to 10 minutes (a full recompute
/// over years of daily rows). Values above the last bound land in the last bucket.
#[derive(Debug, Default)]
pub struct Histogram {
    buckets: [AtomicU64; 8],
    sum: AtomicU64,
    count: AtomicU64,
}

impl Histogram {
    const BUCKET_BOUNDS: [u64; 8] = [10, 50, 250, 1_000, 5_000, 30_000, 120_000, 600_000];

    pub fn observe(&self, ms: u64) {
        self.sum.fetch_add(ms, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);
        let idx = Self::BUCKET_BOUNDS
            .iter()
            .position(|&bound| ms <= bound)
            .unwrap_or(Self::BUCKET_BOUNDS.len() - 1);
        self.buckets[idx].fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn mean(&self) -> f64 {
        match self.count() {
            0 => 0.0,
            n => self.sum.load(Ordering::Relaxed) as f64 / n as f64,
        }
    }

    pub fn buckets(&self) -> Vec<(u64, u64)> {
        Self::BUCKET_BOUNDS
            .iter()
            .zip(self.buckets.iter())
            .map(|(&bound, count)| (bound, count.load(Ordering::Relaxed)))
            .collect()
    }
}

/// Collected metrics for the pipeline.
#[derive(Debug, Default)]
pub struct Metrics {
    // Feed
    pub pages_fetched: Counter,
    pub records_fetched: Counter,
    pub fetch_errors: Counter,

    // Loader
    pub records_inserted: Counter,
    pub records_duplicate: Counter,
    pub records_rejected: Counter,
    pub storage_errors: Counter,

    // Recompute
    pub recompute_runs: Counter,
    pub recompute_failures: Counter,
    pub artifacts_written: Counter,
    pub last_recompute_unix: Gauge,

    // Latency
    pub fetch_latency_ms: Histogram,
    pub insert_latency_ms: Histogram,
    pub recompute_latency_ms: Histogram,
}

/// A snapshot of metrics at a point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub timestamp: DateTime<Utc>,
    pub pages_fetched: u64,
    pub records_fetched: u64,
    pub fetch_errors: u64,
    pub records_inserted: u64,
    pub records_duplicate: u64,
    pub records_rejected: u64,
    pub storage_errors: u64,
    pub recompute_runs: u64,
    pub recompute_failures: u64,
    pub artifacts_written: u64,
    pub last_recompute_unix: u64,
    pub fetch_latency_mean_ms: f64,
    pub insert_latency_mean_ms: f64,
    pub recompute_latency_mean_ms: f64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes a snapshot of current metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            timestamp: Utc::now(),
            pages_fetched: self.pages_fetched.get(),
            records_fetched: self.records_fetched.get(),
            fetch_errors: self.fetch_errors.get(),
            records_inserted: self.records_inserted.get(),
            records_duplicate: self.records_duplicate.get(),
            records_rejected: self.records_rejected.get(),
            storage_errors: self.storage_errors.get(),
            recompute_runs: self.recompute_runs.get(),
            recompute_failures: self.recompute_failures.get(),
            artifacts_written: self.artifacts_written.get(),
            last_recompute_unix: self.last_recompute_unix.get(),
            fetch_latency_mean_ms: self.fetch_latency_ms.mean(),
            insert_latency_mean_ms: self.insert_latency_ms.mean(),
            recompute_latency_mean_ms: self.recompute_latency_ms.mean(),
        }
    }
}

/// Log a snapshot as one structured line.
pub fn log_snapshot(snapshot: &MetricsSnapshot) {
    info!(
        pages_fetched = snapshot.pages_fetched,
        records_fetched = snapshot.records_fetched,
        fetch_errors = snapshot.fetch_errors,
        records_inserted = snapshot.records_inserted,
        records_duplicate = snapshot.records_duplicate,
        records_rejected = snapshot.records_rejected,
        storage_errors = snapshot.storage_errors,
        recompute_runs = snapshot.recompute_runs,
        recompute_failures = snapshot.recompute_failures,
        artifacts_written = snapshot.artifacts_written,
        fetch_latency_mean_ms = snapshot.fetch_latency_mean_ms,
        recompute_latency_mean_ms = snapshot.recompute_latency_mean_ms,
        "Pipeline metrics"
    );
}

/// Global metrics registry.
pub static METRICS: std::sync::LazyLock<Metrics> = std::sync::LazyLock::new(Metrics::new);

/// Get the global metrics instance.
pub fn metrics() -> &'static Metrics {
    &METRICS
}
