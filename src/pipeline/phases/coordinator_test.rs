//! Unit tests for the pipeline coordinator

use super::*;
use crate::abstractions::logger::{INVALID_RECORD_SKIPPED, REDUCE_ERROR, SUMMARY};
use crate::abstractions::{PipelineLogger, Sink, Source, StaticSource, TextResolver};
use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::pipeline::state_machine::PipelineState;
use crate::pipeline::types::RawUnit;
use crate::testing::mocks::{FailingResolver, FailingSource, RecordingLogger, RecordingSink};
use crate::testing::Fixtures;
use serde_json::Value;
use std::sync::Arc;

struct Harness {
    sink: RecordingSink,
    logger: Arc<RecordingLogger>,
}

impl Harness {
    fn new(sink: RecordingSink) -> Self {
        Self {
            sink,
            logger: Arc::new(RecordingLogger::new()),
        }
    }

    fn coordinator(&self, source: Arc<dyn Source>) -> PipelineCoordinator {
        let sink: Arc<dyn Sink> = Arc::new(self.sink.clone());
        let logger: Arc<dyn PipelineLogger> = self.logger.clone();
        PipelineCoordinator::builder()
            .source(source)
            .sink(sink)
            .logger(logger)
            .build()
            .unwrap()
    }
}

fn static_source(values: &[Value]) -> Arc<dyn Source> {
    Arc::new(StaticSource::from_values(values))
}

#[tokio::test]
async fn test_run_walks_every_state() {
    let harness = Harness::new(RecordingSink::new());
    let coordinator = harness.coordinator(static_source(&Fixtures::distinct_keys()));

    let report = coordinator.run().await.unwrap();

    assert_eq!(
        report.states,
        vec![
            PipelineState::Sourcing,
            PipelineState::Mapping,
            PipelineState::Shuffling,
            PipelineState::Reducing,
            PipelineState::Summarizing,
            PipelineState::Done,
        ]
    );
    assert_eq!(coordinator.state(), PipelineState::Done);
    assert_eq!(coordinator.state_history(), report.states);
    assert_eq!(report.phases.len(), 4);
    assert_eq!(report.summary.total, 2);
    assert_eq!(report.summary.line, "Total processed: 2");
    assert_eq!(harness.logger.debug_details(SUMMARY), vec!["Total processed: 2"]);
}

#[tokio::test]
async fn test_run_counts_reads_and_rejections() {
    let harness = Harness::new(RecordingSink::new());
    let coordinator = harness.coordinator(static_source(&Fixtures::with_invalid()));

    let report = coordinator.run().await.unwrap();

    assert_eq!(report.units_read, 2);
    assert_eq!(report.rejected, 1);
    assert_eq!(report.summary.total, 1);
    assert_eq!(harness.sink.committed().len(), 1);
    assert_eq!(harness.logger.count(INVALID_RECORD_SKIPPED), 1);
}

#[tokio::test]
async fn test_source_failure_moves_to_failed() {
    let harness = Harness::new(RecordingSink::new());
    let coordinator = harness.coordinator(Arc::new(FailingSource::default()));

    let err = coordinator.run().await.unwrap_err();

    assert!(matches!(err, PipelineError::SourceUnavailable(_)));
    assert_eq!(
        coordinator.state_history(),
        vec![PipelineState::Sourcing, PipelineState::Failed]
    );
    assert!(harness.logger.debug_details(SUMMARY).is_empty());
}

#[tokio::test]
async fn test_malformed_unit_fails_before_reduce() {
    let harness = Harness::new(RecordingSink::new());
    let source = Arc::new(StaticSource::new(vec![
        RawUnit::new(r#"{"transId":"T1","amount":1}"#),
        RawUnit::new("not json at all"),
    ]));
    let coordinator = harness.coordinator(source);

    let err = coordinator.run().await.unwrap_err();

    assert!(err.is_data_error());
    assert_eq!(coordinator.state(), PipelineState::Failed);
    assert_eq!(
        coordinator.state_history(),
        vec![
            PipelineState::Sourcing,
            PipelineState::Mapping,
            PipelineState::Failed
        ]
    );
    assert_eq!(harness.sink.create_calls(), 0);
}

#[tokio::test]
async fn test_persistence_failures_still_reach_done() {
    let harness = Harness::new(RecordingSink::builder().fail_commit_on(1).build());
    let coordinator = harness.coordinator(static_source(&Fixtures::distinct_keys()));

    let report = coordinator.run().await.unwrap();

    assert_eq!(coordinator.state(), PipelineState::Done);
    assert_eq!(report.summary.total, 2);
    assert_eq!(report.summary.committed, 1);
    assert_eq!(report.summary.failed, 1);
    assert_eq!(harness.logger.count(REDUCE_ERROR), 1);
}

#[tokio::test]
async fn test_custom_resolver_fallback() {
    let harness = Harness::new(RecordingSink::new());
    let resolver: Arc<dyn TextResolver> = Arc::new(FailingResolver);
    let coordinator = PipelineCoordinator::builder()
        .source(static_source(&Fixtures::colliding_keys()))
        .sink(Arc::new(harness.sink.clone()))
        .logger(harness.logger.clone())
        .resolver(resolver)
        .build()
        .unwrap();

    let report = coordinator.run().await.unwrap();

    assert_eq!(report.summary.line, "myTranslations/TOTAL_PROCESSED: 3");
}

#[tokio::test]
async fn test_dry_run_touches_nothing_downstream() {
    let harness = Harness::new(RecordingSink::new());
    let coordinator = harness.coordinator(static_source(&Fixtures::colliding_keys()));

    let report = coordinator.dry_run().await.unwrap();

    assert_eq!(report.units_read, 3);
    assert_eq!(report.emitted, 3);
    assert_eq!(report.rejected, 0);
    assert_eq!(report.distinct_keys, 2);
    assert_eq!(harness.sink.create_calls(), 0);
    assert!(harness.logger.debug_details(SUMMARY).is_empty());
    assert_eq!(coordinator.state(), PipelineState::Mapping);
}

#[tokio::test]
async fn test_coordinator_can_run_twice() {
    let harness = Harness::new(RecordingSink::new());
    let coordinator = harness.coordinator(static_source(&Fixtures::distinct_keys()));

    coordinator.run().await.unwrap();
    let report = coordinator.run().await.unwrap();

    assert_eq!(report.states.first(), Some(&PipelineState::Sourcing));
    assert_eq!(report.states.len(), 6);
    assert_eq!(harness.sink.committed().len(), 4);
}

#[test]
fn test_build_requires_source_and_sink() {
    let err = PipelineCoordinator::builder()
        .sink(Arc::new(RecordingSink::new()))
        .build()
        .err()
        .unwrap();
    assert!(matches!(err, PipelineError::InvalidConfiguration { ref field, .. } if field == "source"));

    let err = PipelineCoordinator::builder()
        .source(static_source(&[]))
        .build()
        .err()
        .unwrap();
    assert!(matches!(err, PipelineError::InvalidConfiguration { ref field, .. } if field == "sink"));
}

#[test]
fn test_build_validates_config() {
    let mut config = PipelineConfig::default();
    config.pipeline.max_parallel_reducers = 0;

    let result = PipelineCoordinator::builder()
        .source(static_source(&[]))
        .sink(Arc::new(RecordingSink::new()))
        .config(config)
        .build();

    assert!(matches!(
        result,
        Err(PipelineError::InvalidConfiguration { .. })
    ));
}
