//! Pipeline event logging
//!
//! The pipeline reports skipped records, persistence failures and the summary
//! line through this collaborator. Implementations must not panic and must be
//! safe to call from many tasks at once.

use tracing::{debug, error};

/// Title used when a record fails validation
pub const INVALID_RECORD_SKIPPED: &str = "Invalid Record Skipped";
/// Title used when persisting a record fails
pub const REDUCE_ERROR: &str = "Reduce Error";
/// Title used for the summary line
pub const SUMMARY: &str = "Summary";

/// Fire-and-forget logging of pipeline events
pub trait PipelineLogger: Send + Sync {
    fn debug(&self, title: &str, details: &str);
    fn error(&self, title: &str, details: &str);
}

/// Logger forwarding pipeline events to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl PipelineLogger for TracingLogger {
    fn debug(&self, title: &str, details: &str) {
        debug!(target: "fintransform::events", title, "{}", details);
    }

    fn error(&self, title: &str, details: &str) {
        error!(target: "fintransform::events", title, "{}", details);
    }
}
