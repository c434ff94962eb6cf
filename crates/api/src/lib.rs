//! HTTP entry point: health probes and job triggers.

pub mod response;
pub mod routes;
pub mod state;

pub use routes::router;
pub use state::AppState;
