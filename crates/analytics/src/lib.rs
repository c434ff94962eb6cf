//! Numeric stages of the recompute job.
//!
//! Every function here is synchronous and CPU-bound; callers run them on a
//! blocking thread. Inputs are ascending by period.

pub mod clustering;
pub mod decomposition;
pub mod forecast;
pub mod input;
pub mod seasons;

pub use clustering::{cluster_severity, KMeans};
pub use decomposition::decompose;
pub use forecast::forecast_next;
pub use input::{forecast_rows, percent_series, ForecastRow, Observation};
pub use seasons::{cluster_rows, season_counts};
