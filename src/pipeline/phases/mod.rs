//! Phase executors for the transformation pipeline
//!
//! Each stage of a run is a separate executor with typed input and output,
//! so the coordinator only sequences them and owns the barriers between them.
//!
//! ```text
//! Source ──> Map (fan-out) ──> Shuffle ──> Reduce (fan-out per key) ──> Summarize
//!                          barrier    barrier                     barrier
//! ```
//!
//! - **Map**: one task per raw unit, bounded by `max_parallel_mappers`.
//!   Emissions travel over a result channel; a malformed unit aborts the run.
//! - **Shuffle**: waits for every emission, restores source order and groups
//!   by transaction id.
//! - **Reduce**: one task per key, bounded by `max_parallel_reducers`;
//!   records inside a group are persisted strictly in order and each record's
//!   failure is contained.
//! - **Summarize**: counts every reduce-stage item and renders the report line.

pub mod coordinator;
pub mod map;
pub mod reduce;
pub mod shuffle;
pub mod summarize;

use serde::{Deserialize, Serialize};

pub use coordinator::{DryRunReport, PipelineBuilder, PipelineCoordinator, RunReport};
pub use map::{map_one, MapOutput, MapPhaseExecutor};
pub use reduce::{ReduceOutput, ReducePhaseExecutor};
pub use shuffle::group;
pub use summarize::SummarizePhaseExecutor;

/// Stage of the pipeline a result belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PhaseType {
    Map,
    Shuffle,
    Reduce,
    Summarize,
}

impl std::fmt::Display for PhaseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PhaseType::Map => write!(f, "Map"),
            PhaseType::Shuffle => write!(f, "Shuffle"),
            PhaseType::Reduce => write!(f, "Reduce"),
            PhaseType::Summarize => write!(f, "Summarize"),
        }
    }
}

/// Metrics collected during phase execution
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhaseMetrics {
    /// Duration in seconds
    pub duration_secs: f64,
    /// Number of items that entered the phase
    pub items_processed: usize,
    /// Number of items the phase passed on or persisted
    pub items_successful: usize,
    /// Number of items rejected or failed
    pub items_failed: usize,
}

/// Result from executing a phase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseResult {
    pub phase_type: PhaseType,
    pub metrics: PhaseMetrics,
}

impl PhaseResult {
    pub fn new(phase_type: PhaseType, metrics: PhaseMetrics) -> Self {
        Self {
            phase_type,
            metrics,
        }
    }
}

#[cfg(test)]
mod coordinator_test;
