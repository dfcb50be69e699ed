//! Sink with scripted failures
//!
//! Call numbers are 1-based and count calls across the whole sink, so
//! `fail_commit_on(2)` fails the second commit of a run whatever record it
//! belongs to.

use crate::abstractions::sink::{EntityHandle, PendingEntity, Sink};
use crate::error::{PersistenceError, SinkOperation};
use crate::pipeline::types::PersistedUnit;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Builder for [`RecordingSink`]
#[derive(Debug, Clone, Default)]
pub struct RecordingSinkBuilder {
    fail_create_on: HashSet<usize>,
    fail_set_on: HashSet<usize>,
    fail_commit_on: HashSet<usize>,
    fail_commit_where: Vec<(String, Value)>,
    panic_on_set_where: Option<(String, Value)>,
    commit_delay: Option<Duration>,
}

impl RecordingSinkBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_create_on(mut self, call: usize) -> Self {
        self.fail_create_on.insert(call);
        self
    }

    pub fn fail_set_on(mut self, call: usize) -> Self {
        self.fail_set_on.insert(call);
        self
    }

    pub fn fail_commit_on(mut self, call: usize) -> Self {
        self.fail_commit_on.insert(call);
        self
    }

    /// Fail the commit of any entity whose `field` holds `value`
    pub fn fail_commit_where(mut self, field: &str, value: Value) -> Self {
        self.fail_commit_where.push((field.to_string(), value));
        self
    }

    /// Panic when `field` is set to `value`
    pub fn panic_on_set_where(mut self, field: &str, value: Value) -> Self {
        self.panic_on_set_where = Some((field.to_string(), value));
        self
    }

    pub fn commit_delay(mut self, delay: Duration) -> Self {
        self.commit_delay = Some(delay);
        self
    }

    pub fn build(self) -> RecordingSink {
        RecordingSink {
            state: Arc::new(SinkState {
                script: self,
                create_calls: AtomicUsize::new(0),
                set_calls: AtomicUsize::new(0),
                commit_calls: AtomicUsize::new(0),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
                committed: Mutex::new(Vec::new()),
            }),
        }
    }
}

#[derive(Debug)]
struct SinkState {
    script: RecordingSinkBuilder,
    create_calls: AtomicUsize,
    set_calls: AtomicUsize,
    commit_calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    committed: Mutex<Vec<PersistedUnit>>,
}

/// Sink recording every call and committed unit
#[derive(Debug, Clone)]
pub struct RecordingSink {
    state: Arc<SinkState>,
}

impl Default for RecordingSink {
    fn default() -> Self {
        RecordingSinkBuilder::new().build()
    }
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> RecordingSinkBuilder {
        RecordingSinkBuilder::new()
    }

    /// Committed units, in commit order
    pub fn committed(&self) -> Vec<PersistedUnit> {
        self.state
            .committed
            .lock()
            .map(|units| units.clone())
            .unwrap_or_default()
    }

    /// Values of `field` across committed units, in commit order
    pub fn committed_values(&self, field: &str) -> Vec<Value> {
        self.committed()
            .into_iter()
            .filter_map(|unit| unit.fields.get(field).cloned())
            .collect()
    }

    pub fn create_calls(&self) -> usize {
        self.state.create_calls.load(Ordering::SeqCst)
    }

    pub fn set_calls(&self) -> usize {
        self.state.set_calls.load(Ordering::SeqCst)
    }

    pub fn commit_calls(&self) -> usize {
        self.state.commit_calls.load(Ordering::SeqCst)
    }

    /// Highest number of commits that were in progress at the same time
    pub fn max_concurrent_commits(&self) -> usize {
        self.state.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Sink for RecordingSink {
    async fn create_entity(
        &self,
        target_type: &str,
    ) -> Result<Box<dyn EntityHandle>, PersistenceError> {
        let call = self.state.create_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.state.script.fail_create_on.contains(&call) {
            return Err(PersistenceError::new(
                SinkOperation::Create,
                format!("scripted failure on create call {}", call),
            ));
        }
        Ok(Box::new(RecordingEntity {
            entity: PendingEntity::new(target_type),
            state: Arc::clone(&self.state),
        }))
    }
}

struct RecordingEntity {
    entity: PendingEntity,
    state: Arc<SinkState>,
}

#[async_trait]
impl EntityHandle for RecordingEntity {
    fn set_field(&mut self, field_id: &str, value: Value) -> Result<(), PersistenceError> {
        let call = self.state.set_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.state.script.fail_set_on.contains(&call) {
            return Err(PersistenceError::new(
                SinkOperation::SetField,
                format!("scripted failure on set call {}", call),
            ));
        }
        if let Some((field, trigger)) = &self.state.script.panic_on_set_where {
            if field == field_id && *trigger == value {
                panic!("scripted panic setting {} to {}", field_id, value);
            }
        }
        self.entity.set(field_id, value)
    }

    async fn commit(self: Box<Self>) -> Result<PersistedUnit, PersistenceError> {
        let RecordingEntity { entity, state } = *self;
        let call = state.commit_calls.fetch_add(1, Ordering::SeqCst) + 1;

        let in_flight = state.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        state.max_in_flight.fetch_max(in_flight, Ordering::SeqCst);
        if let Some(delay) = state.script.commit_delay {
            tokio::time::sleep(delay).await;
        }
        state.in_flight.fetch_sub(1, Ordering::SeqCst);

        let scripted_value = state
            .script
            .fail_commit_where
            .iter()
            .any(|(field, value)| entity.field(field) == Some(value));
        if state.script.fail_commit_on.contains(&call) || scripted_value {
            return Err(PersistenceError::new(
                SinkOperation::Commit,
                format!("scripted failure on commit call {}", call),
            ));
        }

        let unit = entity.into_unit();
        if let Ok(mut committed) = state.committed.lock() {
            committed.push(unit.clone());
        }
        Ok(unit)
    }
}
