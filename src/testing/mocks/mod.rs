//! Mock collaborators for testing
//!
//! Each mock records how it was used so tests can assert on calls as well as
//! on results.

pub mod logger;
pub mod sink;
pub mod source;
pub mod text;

pub use logger::{LogEntry, LogLevel, RecordingLogger};
pub use sink::{RecordingSink, RecordingSinkBuilder};
pub use source::FailingSource;
pub use text::FailingResolver;
