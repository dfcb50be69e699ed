//! Summarize phase: count reduce-stage items and report one line

use super::{PhaseMetrics, PhaseResult, PhaseType};
use crate::abstractions::logger::{PipelineLogger, SUMMARY};
use crate::abstractions::text::{resolve_or_fallback, TextResolver};
use crate::config::SummaryConfig;
use crate::pipeline::types::{ProcessingSummary, ReduceOutcome};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Executor for the summarize phase
pub struct SummarizePhaseExecutor {
    resolver: Arc<dyn TextResolver>,
    logger: Arc<dyn PipelineLogger>,
    summary: SummaryConfig,
}

impl SummarizePhaseExecutor {
    pub fn new(
        resolver: Arc<dyn TextResolver>,
        logger: Arc<dyn PipelineLogger>,
        summary: SummaryConfig,
    ) -> Self {
        Self {
            resolver,
            logger,
            summary,
        }
    }

    /// Build and log the summary
    ///
    /// The total counts every record that reached the reduce stage, whether
    /// or not its persistence succeeded. A label that cannot be resolved
    /// falls back to `"<collection>/<key>"`.
    pub fn summarize(&self, outcomes: &[ReduceOutcome]) -> ProcessingSummary {
        let total = outcomes.iter().map(|o| o.attempted).sum();
        let committed = outcomes.iter().map(|o| o.committed.len()).sum();
        let failed = outcomes.iter().map(|o| o.failures.len()).sum();

        let label = resolve_or_fallback(
            self.resolver.as_ref(),
            &self.summary.collection,
            &self.summary.label_key,
        );
        let line = format!("{}: {}", label, total);
        self.logger.debug(SUMMARY, &line);

        ProcessingSummary {
            total,
            committed,
            failed,
            line,
        }
    }

    /// Run the summary as a timed phase
    pub fn execute(&self, outcomes: &[ReduceOutcome]) -> (ProcessingSummary, PhaseResult) {
        let start_time = Instant::now();
        let summary = self.summarize(outcomes);
        info!("{}", summary.line);

        let metrics = PhaseMetrics {
            duration_secs: start_time.elapsed().as_secs_f64(),
            items_processed: summary.total,
            items_successful: summary.committed,
            items_failed: summary.failed,
        };
        (summary, PhaseResult::new(PhaseType::Summarize, metrics))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abstractions::CatalogResolver;
    use crate::pipeline::types::RecordFailure;
    use crate::testing::mocks::{FailingResolver, RecordingLogger};

    fn outcome(key: &str, attempted: usize, failed: usize) -> ReduceOutcome {
        let mut outcome = ReduceOutcome::new(key);
        outcome.attempted = attempted;
        outcome.failures = (0..failed)
            .map(|position| RecordFailure {
                key: key.to_string(),
                position,
                reason: "commit failed: rejected".to_string(),
            })
            .collect();
        outcome
    }

    fn executor(resolver: Arc<dyn TextResolver>, logger: Arc<RecordingLogger>) -> SummarizePhaseExecutor {
        SummarizePhaseExecutor::new(resolver, logger, SummaryConfig::default())
    }

    #[test]
    fn test_total_includes_failed_records() {
        let logger = Arc::new(RecordingLogger::new());
        let resolver = Arc::new(
            CatalogResolver::new().with_label("myTranslations", "TOTAL_PROCESSED", "Total processed"),
        );

        let summary = executor(resolver, logger.clone())
            .summarize(&[outcome("T1", 2, 0), outcome("T2", 1, 1)]);

        assert_eq!(summary.total, 3);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.line, "Total processed: 3");
        assert_eq!(logger.debug_details(SUMMARY), vec!["Total processed: 3"]);
    }

    #[test]
    fn test_empty_run_reports_zero() {
        let logger = Arc::new(RecordingLogger::new());
        let resolver = Arc::new(CatalogResolver::new().with_label("myTranslations", "TOTAL_PROCESSED", "Total"));

        let summary = executor(resolver, logger.clone()).summarize(&[]);

        assert_eq!(summary.total, 0);
        assert_eq!(summary.line, "Total: 0");
    }

    #[test]
    fn test_unresolvable_label_falls_back() {
        let logger = Arc::new(RecordingLogger::new());

        let (summary, result) = executor(Arc::new(FailingResolver), logger.clone())
            .execute(&[outcome("T1", 1, 0)]);

        assert_eq!(summary.line, "myTranslations/TOTAL_PROCESSED: 1");
        assert_eq!(result.phase_type, PhaseType::Summarize);
        assert_eq!(logger.entries().len(), 1);
    }
}
