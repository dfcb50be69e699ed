//! End-to-end tests for the transformation pipeline
//!
//! Runs complete pipelines against in-memory and file-backed collaborators.

use fintransform::abstractions::logger::{INVALID_RECORD_SKIPPED, REDUCE_ERROR, SUMMARY};
use fintransform::abstractions::{JsonFileSource, JsonLinesSink, MemorySink, StaticSource};
use fintransform::config::PipelineConfig;
use fintransform::error::PipelineError;
use fintransform::pipeline::{AmountPolicy, PersistedUnit, PipelineCoordinator, PipelineState};
use fintransform::testing::mocks::{FailingSource, RecordingLogger, RecordingSink};
use fintransform::testing::Fixtures;
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;

fn pipeline(
    values: &[Value],
    sink: &RecordingSink,
    logger: &Arc<RecordingLogger>,
) -> PipelineCoordinator {
    PipelineCoordinator::builder()
        .source(Arc::new(StaticSource::from_values(values)))
        .sink(Arc::new(sink.clone()))
        .logger(logger.clone())
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_valid_and_invalid_records() {
    let sink = RecordingSink::new();
    let logger = Arc::new(RecordingLogger::new());
    let input = vec![
        json!({"transId": "EXT001", "amount": 100.5}),
        json!({"transId": "EXT002", "amount": 200.0}),
        json!({"transId": null, "amount": 300.0}),
    ];

    let report = pipeline(&input, &sink, &logger).run().await.unwrap();

    assert_eq!(report.rejected, 1);
    assert_eq!(logger.count(INVALID_RECORD_SKIPPED), 1);
    assert!(logger.debug_details(INVALID_RECORD_SKIPPED)[0].contains("300"));
    assert_eq!(sink.create_calls(), 2);
    assert_eq!(sink.commit_calls(), 2);
    assert_eq!(report.summary.total, 2);
    assert_eq!(report.summary.line, "Total processed: 2");
}

#[tokio::test]
async fn test_shared_key_commits_in_source_order() {
    let sink = RecordingSink::new();
    let logger = Arc::new(RecordingLogger::new());
    let input = vec![
        json!({"transId": "EXT001", "amount": 1.0}),
        json!({"transId": "EXT001", "amount": 2.0}),
    ];

    let report = pipeline(&input, &sink, &logger).run().await.unwrap();

    assert_eq!(report.outcomes.len(), 1);
    assert_eq!(report.outcomes[0].key, "EXT001");
    assert_eq!(report.outcomes[0].attempted, 2);
    assert_eq!(
        sink.committed_values("custrecord_amount"),
        vec![json!(1.0), json!(2.0)]
    );
}

#[tokio::test]
async fn test_commit_failure_on_second_record() {
    let sink = RecordingSink::builder().fail_commit_on(2).build();
    let logger = Arc::new(RecordingLogger::new());
    let input = vec![
        json!({"transId": "EXT001", "amount": 10.0}),
        json!({"transId": "EXT001", "amount": 20.0}),
    ];

    let coordinator = pipeline(&input, &sink, &logger);
    let report = coordinator.run().await.unwrap();

    assert_eq!(coordinator.state(), PipelineState::Done);
    assert_eq!(sink.committed_values("custrecord_amount"), vec![json!(10.0)]);
    let errors = logger.error_details(REDUCE_ERROR);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("record 1 of EXT001"));
    assert_eq!(report.summary.total, 2);
    assert_eq!(report.summary.failed, 1);
}

#[tokio::test]
async fn test_source_failure_is_fatal() {
    let sink = RecordingSink::new();
    let logger = Arc::new(RecordingLogger::new());
    let coordinator = PipelineCoordinator::builder()
        .source(Arc::new(FailingSource::new("connection refused")))
        .sink(Arc::new(sink.clone()))
        .logger(logger.clone())
        .build()
        .unwrap();

    let err = coordinator.run().await.unwrap_err();

    assert!(matches!(err, PipelineError::SourceUnavailable(_)));
    assert!(err.to_string().contains("connection refused"));
    assert_eq!(coordinator.state(), PipelineState::Failed);
    assert_eq!(sink.create_calls(), 0);
    assert!(logger.entries().is_empty());
}

#[tokio::test]
async fn test_every_valid_record_is_persisted() {
    let sink = RecordingSink::new();
    let logger = Arc::new(RecordingLogger::new());
    let input = Fixtures::batch(200, 7);

    let report = pipeline(&input, &sink, &logger).run().await.unwrap();

    assert_eq!(sink.create_calls(), 200);
    assert_eq!(sink.commit_calls(), 200);
    assert_eq!(report.outcomes.len(), 7);
    assert_eq!(report.summary.total, 200);
    assert_eq!(logger.debug_details(SUMMARY), vec!["Total processed: 200"]);

    // Within a key, amounts increase with source position
    for outcome in &report.outcomes {
        let amounts: Vec<f64> = outcome
            .committed
            .iter()
            .map(|unit| unit.fields["custrecord_amount"].as_f64().unwrap())
            .collect();
        assert!(amounts.windows(2).all(|w| w[0] < w[1]));
    }
}

#[tokio::test]
async fn test_zero_amount_policy() {
    let input = vec![
        json!({"transId": "Z1", "amount": 0}),
        json!({"transId": "Z2", "amount": 5}),
    ];

    let mut config = PipelineConfig::default();
    config.pipeline.amount_policy = AmountPolicy::NonZero;
    let strict = PipelineCoordinator::builder()
        .source(Arc::new(StaticSource::from_values(&input)))
        .sink(Arc::new(MemorySink::new()))
        .logger(Arc::new(RecordingLogger::new()))
        .config(config)
        .build()
        .unwrap();
    assert_eq!(strict.run().await.unwrap().summary.total, 1);

    let lenient = PipelineCoordinator::builder()
        .source(Arc::new(StaticSource::from_values(&input)))
        .sink(Arc::new(MemorySink::new()))
        .logger(Arc::new(RecordingLogger::new()))
        .build()
        .unwrap();
    assert_eq!(lenient.run().await.unwrap().summary.total, 2);
}

#[tokio::test]
async fn test_file_source_to_json_lines_sink() {
    let temp_dir = TempDir::new().unwrap();
    let input_path = temp_dir.path().join("records.jsonl");
    let output_path = temp_dir.path().join("committed.jsonl");
    std::fs::write(
        &input_path,
        "{\"transId\":\"A\",\"amount\":1}\n\n{\"transactionId\":\"B\",\"amount\":2}\n{\"amount\":3}\n",
    )
    .unwrap();

    let sink = JsonLinesSink::open(&output_path).await.unwrap();
    let coordinator = PipelineCoordinator::builder()
        .source(Arc::new(JsonFileSource::new(&input_path)))
        .sink(Arc::new(sink))
        .logger(Arc::new(RecordingLogger::new()))
        .build()
        .unwrap();

    let report = coordinator.run().await.unwrap();
    assert_eq!(report.units_read, 3);
    assert_eq!(report.rejected, 1);

    let written = std::fs::read_to_string(&output_path).unwrap();
    let units: Vec<PersistedUnit> = written
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(units.len(), 2);
    let mut ids: Vec<_> = units
        .iter()
        .map(|u| u.fields["custrecord_ext_trans_id"].clone())
        .collect();
    ids.sort_by_key(|v| v.to_string());
    assert_eq!(ids, vec![json!("A"), json!("B")]);
}
