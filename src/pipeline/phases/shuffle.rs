//! Shuffle phase: group map emissions by key

use super::{PhaseMetrics, PhaseResult, PhaseType};
use crate::pipeline::types::{KeyedGroup, MappedPair};
use std::time::Instant;
use tracing::info;

/// Group emitted pairs by key
///
/// Pairs are first put back into source order, so each group lists its
/// records in the order the source delivered them and groups appear in order
/// of first key appearance, however the mappers interleaved.
pub fn group(mut pairs: Vec<MappedPair>) -> KeyedGroup {
    pairs.sort_by_key(|pair| pair.index);

    let mut grouped = KeyedGroup::new();
    for pair in pairs {
        grouped.push(pair.key, pair.record);
    }
    grouped
}

/// Run the shuffle as a timed phase
pub fn execute(pairs: Vec<MappedPair>) -> (KeyedGroup, PhaseResult) {
    let start_time = Instant::now();
    let total = pairs.len();
    let grouped = group(pairs);

    info!(
        "Shuffle completed: {} records across {} keys",
        total,
        grouped.len()
    );

    let metrics = PhaseMetrics {
        duration_secs: start_time.elapsed().as_secs_f64(),
        items_processed: total,
        items_successful: grouped.total_records(),
        items_failed: 0,
    };
    (grouped, PhaseResult::new(PhaseType::Shuffle, metrics))
}
