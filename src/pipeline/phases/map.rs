//! Map phase executor
//!
//! Parses and validates every raw unit concurrently. Valid records are emitted
//! as `(transaction id, record)` pairs; rejected records are logged and
//! dropped. A unit that cannot be parsed at all aborts the phase; when several
//! are malformed, the one earliest in the source is reported.

use super::{PhaseMetrics, PhaseResult, PhaseType};
use crate::abstractions::logger::{PipelineLogger, INVALID_RECORD_SKIPPED};
use crate::error::{MalformedInputError, PipelineError};
use crate::pipeline::types::{MappedPair, RawRecord, RawUnit, ValidatedRecord};
use crate::pipeline::validator::{self, AmountPolicy};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, Semaphore};
use tracing::{debug, info, warn};

/// Map a single raw unit
///
/// Returns `Ok(None)` for a record that fails validation, after logging the
/// unit's text as it was received. Stateless: the same unit always maps the same way.
pub fn map_one(
    unit: &RawUnit,
    index: usize,
    policy: AmountPolicy,
    logger: &dyn PipelineLogger,
) -> Result<Option<(String, ValidatedRecord)>, MalformedInputError> {
    let valid = RawRecord::parse(unit, index)?
        .and_then(|record| validator::into_validated(record, policy).ok());

    match valid {
        Some(valid) => Ok(Some((valid.transaction_id().to_string(), valid))),
        None => {
            logger.debug(INVALID_RECORD_SKIPPED, unit.as_str());
            Ok(None)
        }
    }
}

/// Message a mapper task sends on the result channel
#[derive(Debug)]
enum MapEmission {
    Pair(MappedPair),
    Rejected,
    Malformed(MalformedInputError),
}

/// Everything the map phase produced
#[derive(Debug, Clone)]
pub struct MapOutput {
    /// Emitted pairs, in completion order
    pub pairs: Vec<MappedPair>,
    pub rejected: usize,
    pub result: PhaseResult,
}

/// Executor for the map phase
pub struct MapPhaseExecutor {
    policy: AmountPolicy,
    max_parallel: usize,
    logger: Arc<dyn PipelineLogger>,
}

impl MapPhaseExecutor {
    pub fn new(policy: AmountPolicy, max_parallel: usize, logger: Arc<dyn PipelineLogger>) -> Self {
        Self {
            policy,
            max_parallel: max_parallel.max(1),
            logger,
        }
    }

    /// Map every unit and wait for all mapper tasks to finish
    pub async fn execute(&self, units: Vec<RawUnit>) -> Result<MapOutput, PipelineError> {
        let start_time = Instant::now();
        let total = units.len();
        info!(
            "Mapping {} units (max parallel: {})",
            total, self.max_parallel
        );

        let semaphore = Arc::new(Semaphore::new(self.max_parallel));
        let (tx, mut rx) = mpsc::channel::<MapEmission>(self.max_parallel * 2);
        let mut tasks = Vec::with_capacity(total);

        for (index, unit) in units.into_iter().enumerate() {
            let semaphore = Arc::clone(&semaphore);
            let logger = Arc::clone(&self.logger);
            let tx = tx.clone();
            let policy = self.policy;

            tasks.push(tokio::spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return;
                };
                let emission = match map_one(&unit, index, policy, logger.as_ref()) {
                    Ok(Some((key, record))) => MapEmission::Pair(MappedPair { index, key, record }),
                    Ok(None) => MapEmission::Rejected,
                    Err(e) => MapEmission::Malformed(e),
                };
                // The receiver only goes away when the phase already failed
                let _ = tx.send(emission).await;
            }));
        }
        drop(tx);

        let mut pairs = Vec::with_capacity(total);
        let mut rejected = 0;
        let mut malformed: Option<MalformedInputError> = None;
        while let Some(emission) = rx.recv().await {
            match emission {
                MapEmission::Pair(pair) => {
                    debug!("Unit {} emitted key {}", pair.index, pair.key);
                    pairs.push(pair);
                }
                MapEmission::Rejected => rejected += 1,
                MapEmission::Malformed(e) => {
                    if malformed.as_ref().is_some_and(|m| m.index < e.index) {
                        continue;
                    }
                    warn!("Aborting map phase: {}", e);
                    // Units before this one still run so the earliest wins
                    for task in &tasks[e.index + 1..] {
                        task.abort();
                    }
                    malformed = Some(e);
                }
            }
        }

        if let Some(e) = malformed {
            return Err(e.into());
        }

        // Every sender is gone, so every task has finished; surface panics
        for task in tasks {
            if let Err(e) = task.await {
                return Err(PipelineError::MapTaskFailed(e.to_string()));
            }
        }

        let metrics = PhaseMetrics {
            duration_secs: start_time.elapsed().as_secs_f64(),
            items_processed: total,
            items_successful: pairs.len(),
            items_failed: rejected,
        };

        info!(
            "Map phase completed: {} emitted, {} rejected out of {} units",
            pairs.len(),
            rejected,
            total
        );

        Ok(MapOutput {
            pairs,
            rejected,
            result: PhaseResult::new(PhaseType::Map, metrics),
        })
    }
}
