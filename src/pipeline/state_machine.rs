//! Pure pipeline run state machine
//!
//! ## State Machine Diagram
//!
//! ```text
//! ┌──────────┐ Advance ┌─────────┐ Advance ┌───────────┐ Advance ┌──────────┐
//! │ Sourcing │ ──────> │ Mapping │ ──────> │ Shuffling │ ──────> │ Reducing │
//! └────┬─────┘         └────┬────┘         └───────────┘         └────┬─────┘
//!      │ Fail               │ Fail                                    │ Advance
//!      │                    │                                         v
//!      │               ┌────────┐                              ┌─────────────┐
//!      └─────────────> │ Failed │                              │ Summarizing │
//!                      └────────┘                              └──────┬──────┘
//!                                                                     │ Advance
//!                                                                     v
//!                                                                ┌──────┐
//!                                                                │ Done │
//!                                                                └──────┘
//! ```
//!
//! ## Valid State Transitions
//!
//! - Every non-terminal state advances to the next stage.
//! - **Sourcing → Failed**: the source could not deliver its records.
//! - **Mapping → Failed**: a unit could not be parsed.
//!
//! Reduce-stage errors are contained inside the reduce stage, so
//! `Shuffling`, `Reducing` and `Summarizing` cannot fail. `Done` and `Failed`
//! are terminal.

use serde::Serialize;

/// Stage of a pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PipelineState {
    Sourcing,
    Mapping,
    Shuffling,
    Reducing,
    Summarizing,
    Done,
    Failed,
}

impl std::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineState::Sourcing => write!(f, "Sourcing"),
            PipelineState::Mapping => write!(f, "Mapping"),
            PipelineState::Shuffling => write!(f, "Shuffling"),
            PipelineState::Reducing => write!(f, "Reducing"),
            PipelineState::Summarizing => write!(f, "Summarizing"),
            PipelineState::Done => write!(f, "Done"),
            PipelineState::Failed => write!(f, "Failed"),
        }
    }
}

/// Event moving a run between states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineTransition {
    /// The current stage produced its full output
    Advance,
    /// The current stage hit a fatal error
    Fail,
}

impl std::fmt::Display for PipelineTransition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineTransition::Advance => write!(f, "Advance"),
            PipelineTransition::Fail => write!(f, "Fail"),
        }
    }
}

/// Error type for state transitions
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateError {
    #[error("Invalid transition from {from} with {transition}")]
    InvalidTransition {
        from: PipelineState,
        transition: PipelineTransition,
    },
}

/// Apply a transition to the current state
pub fn apply_transition(
    state: PipelineState,
    transition: PipelineTransition,
) -> Result<PipelineState, StateError> {
    use PipelineState::*;
    use PipelineTransition::*;

    match (state, transition) {
        (Sourcing, Advance) => Ok(Mapping),
        (Mapping, Advance) => Ok(Shuffling),
        (Shuffling, Advance) => Ok(Reducing),
        (Reducing, Advance) => Ok(Summarizing),
        (Summarizing, Advance) => Ok(Done),
        (Sourcing, Fail) | (Mapping, Fail) => Ok(Failed),
        (from, transition) => Err(StateError::InvalidTransition { from, transition }),
    }
}

/// Whether no further transitions are possible
pub fn is_terminal(state: PipelineState) -> bool {
    matches!(state, PipelineState::Done | PipelineState::Failed)
}

/// Whether a fatal error is allowed to end the run from this state
pub fn can_fail(state: PipelineState) -> bool {
    apply_transition(state, PipelineTransition::Fail).is_ok()
}
