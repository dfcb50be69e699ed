//! Reduce phase executor
//!
//! Each key's group is persisted by its own task. Inside a group the records
//! are written strictly in order; a record that fails to persist is logged
//! and does not stop the rest of its group or any other group.

use super::{PhaseMetrics, PhaseResult, PhaseType};
use crate::abstractions::logger::{PipelineLogger, REDUCE_ERROR};
use crate::abstractions::Sink;
use crate::config::TargetConfig;
use crate::error::{PersistenceError, SinkOperation};
use crate::pipeline::types::{
    Group, KeyedGroup, PersistedUnit, RecordFailure, ReduceOutcome, ValidatedRecord,
};
use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;
use serde_json::{json, Value};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{debug, error, info};

/// Everything the reduce phase produced
#[derive(Debug, Clone)]
pub struct ReduceOutput {
    /// One outcome per key, in group order
    pub outcomes: Vec<ReduceOutcome>,
    pub result: PhaseResult,
}

impl ReduceOutput {
    /// Records that reached the reduce stage
    pub fn attempted(&self) -> usize {
        self.outcomes.iter().map(|o| o.attempted).sum()
    }

    pub fn committed(&self) -> usize {
        self.outcomes.iter().map(|o| o.committed.len()).sum()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.iter().map(|o| o.failures.len()).sum()
    }
}

/// Executor for the reduce phase
#[derive(Clone)]
pub struct ReducePhaseExecutor {
    sink: Arc<dyn Sink>,
    logger: Arc<dyn PipelineLogger>,
    target: Arc<TargetConfig>,
    max_parallel: usize,
}

impl ReducePhaseExecutor {
    pub fn new(
        sink: Arc<dyn Sink>,
        logger: Arc<dyn PipelineLogger>,
        target: TargetConfig,
        max_parallel: usize,
    ) -> Self {
        Self {
            sink,
            logger,
            target: Arc::new(target),
            max_parallel: max_parallel.max(1),
        }
    }

    /// Persist every record of one group, in order
    pub async fn reduce_group(&self, key: &str, records: &[ValidatedRecord]) -> ReduceOutcome {
        let mut outcome = ReduceOutcome::new(key);

        for (position, record) in records.iter().enumerate() {
            outcome.attempted += 1;
            let persisted = AssertUnwindSafe(self.persist_record(record))
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| Err(panicked(panic.as_ref())));
            match persisted {
                Ok(unit) => {
                    debug!("Committed record {} of {} as {}", position, key, unit.id);
                    outcome.committed.push(unit);
                }
                Err(e) => {
                    let reason = e.to_string();
                    self.logger.error(
                        REDUCE_ERROR,
                        &format!("Failed to persist record {} of {}: {}", position, key, reason),
                    );
                    outcome.failures.push(RecordFailure {
                        key: key.to_string(),
                        position,
                        reason,
                    });
                }
            }
        }

        outcome
    }

    async fn persist_record(
        &self,
        record: &ValidatedRecord,
    ) -> Result<PersistedUnit, PersistenceError> {
        let mut entity = self.sink.create_entity(&self.target.record_type).await?;
        entity.set_field(
            &self.target.key_field,
            Value::String(record.transaction_id().to_string()),
        )?;
        entity.set_field(&self.target.amount_field, json!(record.amount()))?;
        entity.commit().await
    }

    /// Reduce every group and wait for all reducer tasks to finish
    pub async fn execute(&self, grouped: KeyedGroup) -> ReduceOutput {
        let start_time = Instant::now();
        let total_records = grouped.total_records();
        let groups = grouped.into_groups();
        info!(
            "Reducing {} records across {} keys (max parallel: {})",
            total_records,
            groups.len(),
            self.max_parallel
        );

        let semaphore = Arc::new(Semaphore::new(self.max_parallel));
        let mut outcomes: Vec<Option<ReduceOutcome>> = vec![None; groups.len()];
        let mut pending: Vec<(String, usize)> = Vec::with_capacity(groups.len());
        let mut tasks = FuturesUnordered::new();

        for (slot, Group { key, records }) in groups.into_iter().enumerate() {
            pending.push((key.clone(), records.len()));
            let executor = self.clone();
            let semaphore = Arc::clone(&semaphore);

            let handle = tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                executor.reduce_group(&key, &records).await
            });
            tasks.push(async move { (slot, handle.await) });
        }

        while let Some((slot, joined)) = tasks.next().await {
            let outcome = match joined {
                Ok(outcome) => outcome,
                Err(e) => {
                    let (key, size) = &pending[slot];
                    error!("Reducer for {} did not complete: {}", key, e);
                    self.failed_group(key, *size, &e.to_string())
                }
            };
            outcomes[slot] = Some(outcome);
        }

        let outcomes: Vec<ReduceOutcome> = outcomes.into_iter().flatten().collect();
        let committed = outcomes.iter().map(|o| o.committed.len()).sum();
        let failed = outcomes.iter().map(|o| o.failures.len()).sum();

        info!(
            "Reduce phase completed: {} committed, {} failed out of {} records",
            committed, failed, total_records
        );

        let metrics = PhaseMetrics {
            duration_secs: start_time.elapsed().as_secs_f64(),
            items_processed: total_records,
            items_successful: committed,
            items_failed: failed,
        };
        ReduceOutput {
            outcomes,
            result: PhaseResult::new(PhaseType::Reduce, metrics),
        }
    }

    /// Outcome for a group whose task died outside any single record:
    /// every record counts as failed
    fn failed_group(&self, key: &str, size: usize, reason: &str) -> ReduceOutcome {
        let mut outcome = ReduceOutcome::new(key);
        outcome.attempted = size;
        for position in 0..size {
            self.logger.error(
                REDUCE_ERROR,
                &format!("Failed to persist record {} of {}: {}", position, key, reason),
            );
            outcome.failures.push(RecordFailure {
                key: key.to_string(),
                position,
                reason: reason.to_string(),
            });
        }
        outcome
    }
}

/// Persistence error standing in for a sink call that panicked
fn panicked(panic: &(dyn Any + Send)) -> PersistenceError {
    let message = panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    PersistenceError::new(SinkOperation::Commit, format!("sink panicked: {}", message))
}
