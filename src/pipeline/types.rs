//! Data types flowing between pipeline stages
//!
//! Ownership moves strictly forward: a [`RawUnit`] is read by one mapper task,
//! the resulting [`ValidatedRecord`] moves into a [`KeyedGroup`], each record of
//! a group is consumed by the reduce invocation for its key, and the
//! [`PersistedUnit`] produced by a commit belongs to the sink.

use crate::error::MalformedInputError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

/// JSON field carrying the business key
pub const KEY_FIELD: &str = "transId";
/// Accepted alternative spelling of [`KEY_FIELD`]
pub const KEY_FIELD_ALIAS: &str = "transactionId";
/// JSON field carrying the amount
pub const AMOUNT_FIELD: &str = "amount";

/// One unit of JSON text as delivered by a source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawUnit(String);

impl RawUnit {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// Serialize a JSON value into a unit
    pub fn from_value(value: &Value) -> Self {
        Self(value.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RawUnit {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<String> for RawUnit {
    fn from(text: String) -> Self {
        Self(text)
    }
}

/// Structural parse of a raw unit, before business validation
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    transaction_id: Option<String>,
    amount: Option<f64>,
    payload: Map<String, Value>,
}

impl RawRecord {
    /// Parse a unit into a record
    ///
    /// A JSON `null` document is an absent record and yields `Ok(None)`.
    /// Anything that is not JSON, or is JSON but neither an object nor `null`,
    /// is malformed.
    pub fn parse(unit: &RawUnit, index: usize) -> Result<Option<Self>, MalformedInputError> {
        let value: Value =
            serde_json::from_str(unit.as_str()).map_err(|e| MalformedInputError {
                index,
                reason: e.to_string(),
            })?;

        match value {
            Value::Null => Ok(None),
            Value::Object(map) => Ok(Some(Self::from_object(map))),
            other => Err(MalformedInputError {
                index,
                reason: format!("expected a JSON object, found {}", json_kind(&other)),
            }),
        }
    }

    /// Build a record from an already-parsed JSON object
    ///
    /// Non-string keys and non-numeric amounts are treated as absent.
    pub fn from_object(payload: Map<String, Value>) -> Self {
        let transaction_id = payload
            .get(KEY_FIELD)
            .and_then(Value::as_str)
            .or_else(|| payload.get(KEY_FIELD_ALIAS).and_then(Value::as_str))
            .map(str::to_string);
        let amount = payload.get(AMOUNT_FIELD).and_then(Value::as_f64);

        Self {
            transaction_id,
            amount,
            payload,
        }
    }

    pub fn transaction_id(&self) -> Option<&str> {
        self.transaction_id.as_deref()
    }

    pub fn amount(&self) -> Option<f64> {
        self.amount
    }

    pub fn payload(&self) -> &Map<String, Value> {
        &self.payload
    }

    pub(crate) fn into_validated(self) -> Result<ValidatedRecord, Self> {
        match (self.transaction_id, self.amount) {
            (Some(transaction_id), Some(amount)) if !transaction_id.is_empty() => {
                Ok(ValidatedRecord {
                    transaction_id,
                    amount,
                    payload: self.payload,
                })
            }
            (transaction_id, amount) => Err(Self {
                transaction_id,
                amount,
                payload: self.payload,
            }),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// A record that passed validation
///
/// Always carries a non-empty transaction id and an amount; the only way to
/// obtain one is through the validator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidatedRecord {
    transaction_id: String,
    amount: f64,
    payload: Map<String, Value>,
}

impl ValidatedRecord {
    pub fn transaction_id(&self) -> &str {
        &self.transaction_id
    }

    pub fn amount(&self) -> f64 {
        self.amount
    }

    pub fn payload(&self) -> &Map<String, Value> {
        &self.payload
    }
}

/// One emission of the map stage
#[derive(Debug, Clone, PartialEq)]
pub struct MappedPair {
    /// Position of the originating unit in the source sequence
    pub index: usize,
    pub key: String,
    pub record: ValidatedRecord,
}

/// Records sharing one key, in source order
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub key: String,
    pub records: Vec<ValidatedRecord>,
}

/// Output of the shuffle: groups listed in order of first key appearance
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeyedGroup {
    groups: Vec<Group>,
    positions: HashMap<String, usize>,
}

impl KeyedGroup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record to the bucket for `key`, creating the bucket if needed
    pub fn push(&mut self, key: String, record: ValidatedRecord) {
        match self.positions.get(&key) {
            Some(&position) => self.groups[position].records.push(record),
            None => {
                self.positions.insert(key.clone(), self.groups.len());
                self.groups.push(Group {
                    key,
                    records: vec![record],
                });
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&[ValidatedRecord]> {
        self.positions
            .get(key)
            .map(|&position| self.groups[position].records.as_slice())
    }

    /// Number of distinct keys
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Number of records across all groups
    pub fn total_records(&self) -> usize {
        self.groups.iter().map(|g| g.records.len()).sum()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(|g| g.key.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Group> {
        self.groups.iter()
    }

    pub fn into_groups(self) -> Vec<Group> {
        self.groups
    }
}

/// A committed target entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedUnit {
    pub id: Uuid,
    pub target_type: String,
    pub fields: BTreeMap<String, Value>,
    pub committed_at: DateTime<Utc>,
}

/// A record of a group whose persistence failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordFailure {
    pub key: String,
    /// Position of the record within its group
    pub position: usize,
    pub reason: String,
}

/// Result of reducing one group
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReduceOutcome {
    pub key: String,
    /// Records that reached the reduce stage, whether or not they committed
    pub attempted: usize,
    pub committed: Vec<PersistedUnit>,
    pub failures: Vec<RecordFailure>,
}

impl ReduceOutcome {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            attempted: 0,
            committed: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Aggregate report produced once per successful run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessingSummary {
    /// Key/value pairs that reached the reduce stage
    pub total: usize,
    pub committed: usize,
    pub failed: usize,
    /// Localized report line, `"<label>: <total>"`
    pub line: String,
}
