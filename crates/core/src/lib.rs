//! Core types, records, and errors for the nuclear outage pipeline.

pub mod artifacts;
pub mod error;
pub mod limits;
pub mod record;
pub mod season;
pub mod store;
pub mod window;

pub use artifacts::*;
pub use error::{Error, Result};
pub use record::*;
pub use season::*;
pub use store::*;
pub use window::*;
