//! Pipeline coordinator
//!
//! Sequences the phases of one run and tracks the run's state.
//!
//! ```text
//! ┌──────────┐   ┌─────────┐   ┌───────────┐   ┌──────────┐   ┌─────────────┐   ┌──────┐
//! │ Sourcing │──>│ Mapping │──>│ Shuffling │──>│ Reducing │──>│ Summarizing │──>│ Done │
//! └────┬─────┘   └────┬────┘   └───────────┘   └──────────┘   └─────────────┘   └──────┘
//!      │ source error │ malformed unit
//!      v              v
//! ┌────────────────────────┐
//! │         Failed         │
//! └────────────────────────┘
//! ```
//!
//! Persistence and label failures never leave the happy path: they are
//! logged, counted and the run still ends in `Done`.

use super::map::MapPhaseExecutor;
use super::reduce::ReducePhaseExecutor;
use super::summarize::SummarizePhaseExecutor;
use super::{shuffle, PhaseMetrics, PhaseResult};
use crate::abstractions::{PipelineLogger, Sink, Source, TextResolver, TracingLogger};
use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::pipeline::state_machine::{apply_transition, PipelineState, PipelineTransition};
use crate::pipeline::types::{ProcessingSummary, ReduceOutcome};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{error, info};

/// Result of a successful run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub summary: ProcessingSummary,
    pub units_read: usize,
    pub rejected: usize,
    pub outcomes: Vec<ReduceOutcome>,
    pub phases: Vec<PhaseResult>,
    pub states: Vec<PipelineState>,
}

/// Result of a dry run: what the map stage would emit
#[derive(Debug, Clone, Serialize)]
pub struct DryRunReport {
    pub units_read: usize,
    pub emitted: usize,
    pub rejected: usize,
    pub distinct_keys: usize,
    pub metrics: PhaseMetrics,
}

/// Builder for [`PipelineCoordinator`]
#[derive(Default)]
pub struct PipelineBuilder {
    source: Option<Arc<dyn Source>>,
    sink: Option<Arc<dyn Sink>>,
    logger: Option<Arc<dyn PipelineLogger>>,
    resolver: Option<Arc<dyn TextResolver>>,
    config: PipelineConfig,
}

impl PipelineBuilder {
    pub fn source(mut self, source: Arc<dyn Source>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn sink(mut self, sink: Arc<dyn Sink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn logger(mut self, logger: Arc<dyn PipelineLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn resolver(mut self, resolver: Arc<dyn TextResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Validate the configuration and assemble the coordinator
    ///
    /// The logger defaults to [`TracingLogger`] and the resolver to the
    /// configuration's label catalog.
    pub fn build(self) -> PipelineResult<PipelineCoordinator> {
        let source = self.source.ok_or_else(|| missing("source"))?;
        let sink = self.sink.ok_or_else(|| missing("sink"))?;
        self.config.validate()?;

        let logger = self
            .logger
            .unwrap_or_else(|| Arc::new(TracingLogger) as Arc<dyn PipelineLogger>);
        let resolver = self
            .resolver
            .unwrap_or_else(|| Arc::new(self.config.label_catalog()) as Arc<dyn TextResolver>);

        Ok(PipelineCoordinator {
            source,
            sink,
            logger,
            resolver,
            config: self.config,
            states: Mutex::new(vec![PipelineState::Sourcing]),
        })
    }
}

fn missing(field: &str) -> PipelineError {
    PipelineError::InvalidConfiguration {
        field: field.to_string(),
        reason: "is required".to_string(),
    }
}

/// Runs the pipeline against injected collaborators
pub struct PipelineCoordinator {
    source: Arc<dyn Source>,
    sink: Arc<dyn Sink>,
    logger: Arc<dyn PipelineLogger>,
    resolver: Arc<dyn TextResolver>,
    config: PipelineConfig,
    states: Mutex<Vec<PipelineState>>,
}

impl PipelineCoordinator {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Current state of the most recent run
    pub fn state(&self) -> PipelineState {
        self.history()
            .last()
            .copied()
            .unwrap_or(PipelineState::Sourcing)
    }

    /// Every state the most recent run passed through, in order
    pub fn state_history(&self) -> Vec<PipelineState> {
        self.history().clone()
    }

    fn history(&self) -> MutexGuard<'_, Vec<PipelineState>> {
        self.states.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn reset(&self) {
        *self.history() = vec![PipelineState::Sourcing];
    }

    fn transition(&self, transition: PipelineTransition) -> PipelineResult<PipelineState> {
        let mut history = self.history();
        let current = history.last().copied().unwrap_or(PipelineState::Sourcing);
        let next = apply_transition(current, transition)?;
        history.push(next);
        info!("Pipeline state: {} -> {}", current, next);
        Ok(next)
    }

    /// Move to `Failed` and hand back the error that caused it
    fn fail(&self, err: PipelineError) -> PipelineError {
        error!("Pipeline failed in {}: {}", self.state(), err);
        match self.transition(PipelineTransition::Fail) {
            Ok(_) => err,
            Err(state_err) => state_err,
        }
    }

    fn map_executor(&self) -> MapPhaseExecutor {
        MapPhaseExecutor::new(
            self.config.pipeline.amount_policy,
            self.config.pipeline.max_parallel_mappers,
            Arc::clone(&self.logger),
        )
    }

    /// Execute a complete run
    pub async fn run(&self) -> PipelineResult<RunReport> {
        self.reset();
        info!("Starting pipeline run from {}", self.source.describe());

        let units = match self.source.fetch_all().await {
            Ok(units) => units,
            Err(e) => return Err(self.fail(e.into())),
        };
        let units_read = units.len();
        self.transition(PipelineTransition::Advance)?;

        let mapped = match self.map_executor().execute(units).await {
            Ok(mapped) => mapped,
            Err(e) => return Err(self.fail(e)),
        };
        self.transition(PipelineTransition::Advance)?;

        let (grouped, shuffle_result) = shuffle::execute(mapped.pairs);
        self.transition(PipelineTransition::Advance)?;

        let reducer = ReducePhaseExecutor::new(
            Arc::clone(&self.sink),
            Arc::clone(&self.logger),
            self.config.target.clone(),
            self.config.pipeline.max_parallel_reducers,
        );
        let reduced = reducer.execute(grouped).await;
        self.transition(PipelineTransition::Advance)?;

        let summarizer = SummarizePhaseExecutor::new(
            Arc::clone(&self.resolver),
            Arc::clone(&self.logger),
            self.config.summary.clone(),
        );
        let (summary, summarize_result) = summarizer.execute(&reduced.outcomes);
        self.transition(PipelineTransition::Advance)?;

        Ok(RunReport {
            summary,
            units_read,
            rejected: mapped.rejected,
            outcomes: reduced.outcomes,
            phases: vec![
                mapped.result,
                shuffle_result,
                reduced.result,
                summarize_result,
            ],
            states: self.state_history(),
        })
    }

    /// Source and map only, touching neither the sink nor the resolver
    ///
    /// The run stops in `Mapping`; invalid records are still logged.
    pub async fn dry_run(&self) -> PipelineResult<DryRunReport> {
        self.reset();
        info!("Starting dry run from {}", self.source.describe());

        let units = match self.source.fetch_all().await {
            Ok(units) => units,
            Err(e) => return Err(self.fail(e.into())),
        };
        let units_read = units.len();
        self.transition(PipelineTransition::Advance)?;

        let mapped = match self.map_executor().execute(units).await {
            Ok(mapped) => mapped,
            Err(e) => return Err(self.fail(e)),
        };
        let distinct_keys = mapped
            .pairs
            .iter()
            .map(|pair| pair.key.as_str())
            .collect::<HashSet<_>>()
            .len();

        Ok(DryRunReport {
            units_read,
            emitted: mapped.pairs.len(),
            rejected: mapped.rejected,
            distinct_keys,
            metrics: mapped.result.metrics,
        })
    }
}
