//! # fintransform
//!
//! Map/reduce batch pipeline that validates external financial records and
//! persists each valid one as a target entity.
//!
//! ## Usage
//!
//! ```bash
//! fintransform run records.json [--output committed.jsonl] [--config fintransform.toml]
//! fintransform check records.jsonl
//! ```
//!
//! ## Modules
//!
//! - `abstractions` - Traits for the source, sink, event logger and label resolver
//! - `app` - Logging setup for the binary
//! - `config` - TOML and environment configuration
//! - `error` - Fatal and record-local error types
//! - `pipeline` - Validation, state machine and the map/shuffle/reduce/summarize phases
//! - `testing` - Mock collaborators and fixtures for tests and benchmarks
pub mod abstractions;
pub mod app;
pub mod config;
pub mod error;
pub mod pipeline;

pub mod testing;
