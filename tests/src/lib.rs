//! Shared support for the outage pipeline integration tests.

pub mod mocks;
