//! Telemetry for the outage pipeline: structured logging, component health,
//! and in-process counters that the scheduler logs after every run.

pub mod health;
pub mod metrics;
pub mod tracing_setup;

pub use health::*;
pub use metrics::*;
pub use tracing_setup::*;
