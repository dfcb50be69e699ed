//! Error types for the transformation pipeline
//!
//! Only two conditions abort a run: the source cannot deliver its records, or
//! a raw unit cannot be parsed into a structural record at all. Persistence
//! and label resolution failures are local to one record or one summary line
//! and are reported through the pipeline logger instead of propagating.

use crate::pipeline::state_machine::StateError;
use thiserror::Error;

/// Fatal errors that terminate a pipeline run
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Source unavailable: {0}")]
    SourceUnavailable(#[from] SourceError),

    #[error("Malformed input at unit {}: {}", .0.index, .0.reason)]
    MalformedInput(#[from] MalformedInputError),

    #[error("Map task failed: {0}")]
    MapTaskFailed(String),

    #[error("Invalid pipeline configuration for {field}: {reason}")]
    InvalidConfiguration { field: String, reason: String },

    #[error("Pipeline state error: {0}")]
    InvalidTransition(#[from] StateError),
}

impl PipelineError {
    /// Whether this error was caused by the data rather than by the environment
    pub fn is_data_error(&self) -> bool {
        matches!(self, PipelineError::MalformedInput(_))
    }
}

/// A raw unit that could not be parsed into a record
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unit {index} is malformed: {reason}")]
pub struct MalformedInputError {
    /// Position of the unit in the source sequence
    pub index: usize,
    pub reason: String,
}

/// Failure to read the raw record sequence
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Failed to read {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Source document {path} is not a JSON array: {reason}")]
    InvalidDocument { path: String, reason: String },

    #[error("{0}")]
    Unavailable(String),
}

/// Failure of a single sink operation
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{operation} failed: {reason}")]
pub struct PersistenceError {
    pub operation: SinkOperation,
    pub reason: String,
}

impl PersistenceError {
    pub fn new(operation: SinkOperation, reason: impl Into<String>) -> Self {
        Self {
            operation,
            reason: reason.into(),
        }
    }
}

/// The sink call that produced a [`PersistenceError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkOperation {
    Create,
    SetField,
    Commit,
}

impl std::fmt::Display for SinkOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SinkOperation::Create => write!(f, "create"),
            SinkOperation::SetField => write!(f, "set field"),
            SinkOperation::Commit => write!(f, "commit"),
        }
    }
}

/// A label that could not be resolved
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("No label for {collection}/{key}")]
pub struct ResolutionError {
    pub collection: String,
    pub key: String,
}

pub type PipelineResult<T> = Result<T, PipelineError>;
