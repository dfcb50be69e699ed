//! Testing utilities and fixtures
//!
//! Mock collaborators and sample data shared by the unit tests, the
//! integration tests and the benchmarks.

pub mod fixtures;
pub mod mocks;

pub use fixtures::Fixtures;
