//! The transformation pipeline
//!
//! A run reads every raw unit from the source, maps each one to a
//! `(transaction id, record)` pair or rejects it, groups the pairs by key,
//! persists every group through the sink and reports a summary line.

pub mod phases;
pub mod state_machine;
pub mod types;
pub mod validator;

pub use phases::{
    DryRunReport, PhaseMetrics, PhaseResult, PhaseType, PipelineBuilder, PipelineCoordinator,
    RunReport,
};
pub use state_machine::{PipelineState, PipelineTransition, StateError};
pub use types::{
    Group, KeyedGroup, MappedPair, PersistedUnit, ProcessingSummary, RawRecord, RawUnit,
    RecordFailure, ReduceOutcome, ValidatedRecord,
};
pub use validator::{validate, AmountPolicy};

/// Short name for the coordinator
pub type Pipeline = PipelineCoordinator;
