//! Sample records and batches

use crate::pipeline::types::{RawRecord, RawUnit, ValidatedRecord, AMOUNT_FIELD, KEY_FIELD};
use crate::pipeline::validator::{self, AmountPolicy};
use serde_json::{json, Map, Value};

/// Build a validated record with the given id and amount
///
/// Panics if `transaction_id` is empty.
pub fn validated_record(transaction_id: &str, amount: f64) -> ValidatedRecord {
    let mut payload = Map::new();
    payload.insert(KEY_FIELD.to_string(), json!(transaction_id));
    payload.insert(AMOUNT_FIELD.to_string(), json!(amount));
    let record = RawRecord::from_object(payload);
    validator::into_validated(record, AmountPolicy::Present)
        .unwrap_or_else(|_| panic!("fixture record {:?} must be valid", transaction_id))
}

/// Common input batches
pub struct Fixtures;

impl Fixtures {
    /// Two valid records under distinct keys
    pub fn distinct_keys() -> Vec<Value> {
        vec![
            json!({"transId": "T1", "amount": 100}),
            json!({"transId": "T2", "amount": 50}),
        ]
    }

    /// One valid record followed by one missing its transaction id
    pub fn with_invalid() -> Vec<Value> {
        vec![
            json!({"transId": "T1", "amount": 100}),
            json!({"amount": 50}),
        ]
    }

    /// Three records, two sharing a key
    pub fn colliding_keys() -> Vec<Value> {
        vec![
            json!({"transId": "T1", "amount": 10}),
            json!({"transId": "T1", "amount": 20}),
            json!({"transId": "T2", "amount": 5}),
        ]
    }

    /// A generated batch of `size` valid records spread over `keys` keys
    pub fn batch(size: usize, keys: usize) -> Vec<Value> {
        let keys = keys.max(1);
        (0..size)
            .map(|i| json!({"transId": format!("T{}", i % keys), "amount": i as f64 + 0.5}))
            .collect()
    }

    pub fn units(values: &[Value]) -> Vec<RawUnit> {
        values.iter().map(RawUnit::from_value).collect()
    }
}
