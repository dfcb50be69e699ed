//! Target entity persistence
//!
//! Persisting one record is a three-step conversation with the sink: create an
//! entity of the target type, set its fields, then commit. Every step may fail
//! independently; the reduce stage treats each failure as local to the record.

use crate::error::{PersistenceError, SinkOperation};
use crate::pipeline::types::PersistedUnit;
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

/// Trait for creating target entities
#[async_trait]
pub trait Sink: Send + Sync {
    /// Start a new, uncommitted entity of the given type
    async fn create_entity(
        &self,
        target_type: &str,
    ) -> Result<Box<dyn EntityHandle>, PersistenceError>;
}

/// An entity that has been created but not yet committed
#[async_trait]
pub trait EntityHandle: Send {
    fn set_field(&mut self, field_id: &str, value: Value) -> Result<(), PersistenceError>;

    /// Persist the entity; the unit is durable once this returns `Ok`
    async fn commit(self: Box<Self>) -> Result<PersistedUnit, PersistenceError>;
}

/// Field buffer shared by the bundled sinks
#[derive(Debug, Clone)]
pub struct PendingEntity {
    target_type: String,
    fields: BTreeMap<String, Value>,
}

impl PendingEntity {
    pub fn new(target_type: impl Into<String>) -> Self {
        Self {
            target_type: target_type.into(),
            fields: BTreeMap::new(),
        }
    }

    pub fn set(&mut self, field_id: &str, value: Value) -> Result<(), PersistenceError> {
        if field_id.trim().is_empty() {
            return Err(PersistenceError::new(
                SinkOperation::SetField,
                "field id must not be empty",
            ));
        }
        self.fields.insert(field_id.to_string(), value);
        Ok(())
    }

    pub fn field(&self, field_id: &str) -> Option<&Value> {
        self.fields.get(field_id)
    }

    /// Stamp the entity with an id and commit time
    pub fn into_unit(self) -> PersistedUnit {
        PersistedUnit {
            id: Uuid::new_v4(),
            target_type: self.target_type,
            fields: self.fields,
            committed_at: Utc::now(),
        }
    }
}

/// Sink keeping committed units in memory
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    committed: Arc<Mutex<Vec<PersistedUnit>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every committed unit, in commit order
    pub fn committed(&self) -> Vec<PersistedUnit> {
        self.committed
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn len(&self) -> usize {
        self.committed
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl Sink for MemorySink {
    async fn create_entity(
        &self,
        target_type: &str,
    ) -> Result<Box<dyn EntityHandle>, PersistenceError> {
        Ok(Box::new(MemoryEntity {
            entity: PendingEntity::new(target_type),
            committed: Arc::clone(&self.committed),
        }))
    }
}

struct MemoryEntity {
    entity: PendingEntity,
    committed: Arc<Mutex<Vec<PersistedUnit>>>,
}

#[async_trait]
impl EntityHandle for MemoryEntity {
    fn set_field(&mut self, field_id: &str, value: Value) -> Result<(), PersistenceError> {
        self.entity.set(field_id, value)
    }

    async fn commit(self: Box<Self>) -> Result<PersistedUnit, PersistenceError> {
        let MemoryEntity { entity, committed } = *self;
        let unit = entity.into_unit();
        let mut committed = committed.lock().map_err(|_| {
            PersistenceError::new(SinkOperation::Commit, "memory sink state is poisoned")
        })?;
        committed.push(unit.clone());
        Ok(unit)
    }
}

/// Sink appending each committed unit as one JSON line to a file
#[derive(Debug, Clone)]
pub struct JsonLinesSink {
    path: PathBuf,
    file: Arc<tokio::sync::Mutex<tokio::fs::File>>,
}

impl JsonLinesSink {
    /// Open (or create) the output file in append mode
    pub async fn open(path: impl Into<PathBuf>) -> std::io::Result<Self> {
        let path = path.into();
        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        Ok(Self {
            path,
            file: Arc::new(tokio::sync::Mutex::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl Sink for JsonLinesSink {
    async fn create_entity(
        &self,
        target_type: &str,
    ) -> Result<Box<dyn EntityHandle>, PersistenceError> {
        Ok(Box::new(JsonLinesEntity {
            entity: PendingEntity::new(target_type),
            file: Arc::clone(&self.file),
        }))
    }
}

struct JsonLinesEntity {
    entity: PendingEntity,
    file: Arc<tokio::sync::Mutex<tokio::fs::File>>,
}

#[async_trait]
impl EntityHandle for JsonLinesEntity {
    fn set_field(&mut self, field_id: &str, value: Value) -> Result<(), PersistenceError> {
        self.entity.set(field_id, value)
    }

    async fn commit(self: Box<Self>) -> Result<PersistedUnit, PersistenceError> {
        let JsonLinesEntity { entity, file } = *self;
        let unit = entity.into_unit();
        let mut line = serde_json::to_string(&unit)
            .map_err(|e| PersistenceError::new(SinkOperation::Commit, e.to_string()))?;
        line.push('\n');

        let mut file = file.lock().await;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| PersistenceError::new(SinkOperation::Commit, e.to_string()))?;
        file.flush()
            .await
            .map_err(|e| PersistenceError::new(SinkOperation::Commit, e.to_string()))?;
        Ok(unit)
    }
}
