//! Business validation of raw records

use super::types::{RawRecord, ValidatedRecord};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// How a zero amount is treated
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmountPolicy {
    /// Any numeric amount is valid, zero included
    #[default]
    Present,
    /// Zero amounts are rejected along with missing ones
    NonZero,
}

impl FromStr for AmountPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "present" => Ok(AmountPolicy::Present),
            "non_zero" | "nonzero" => Ok(AmountPolicy::NonZero),
            other => Err(format!(
                "unknown amount policy '{}', expected 'present' or 'non_zero'",
                other
            )),
        }
    }
}

impl std::fmt::Display for AmountPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AmountPolicy::Present => write!(f, "present"),
            AmountPolicy::NonZero => write!(f, "non_zero"),
        }
    }
}

/// Check whether a record may enter the pipeline
///
/// Rejects an absent record, a missing or empty transaction id, and a
/// missing amount. Under [`AmountPolicy::NonZero`] a zero amount is rejected
/// as well.
pub fn validate(record: Option<&RawRecord>, policy: AmountPolicy) -> bool {
    let Some(record) = record else {
        return false;
    };

    if record.transaction_id().map_or(true, str::is_empty) {
        return false;
    }

    match (record.amount(), policy) {
        (None, _) => false,
        (Some(amount), AmountPolicy::NonZero) => amount != 0.0,
        (Some(_), AmountPolicy::Present) => true,
    }
}

/// Validate and convert in one step
pub fn into_validated(
    record: RawRecord,
    policy: AmountPolicy,
) -> Result<ValidatedRecord, RawRecord> {
    if !validate(Some(&record), policy) {
        return Err(record);
    }
    record.into_validated()
}
