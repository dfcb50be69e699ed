//! Logging configuration and initialization

use crate::app::config::AppConfig;
use tracing::{debug, trace, warn};
use tracing_subscriber::EnvFilter;

/// Environment variable replacing the verbosity-derived filter
pub const LOG_ENV: &str = "FINTRANSFORM_LOG";

/// Build the log filter
///
/// Directives from `FINTRANSFORM_LOG` win when they parse; otherwise the
/// filter follows the `-v` count. The second value is the rejected override,
/// if any.
pub fn build_filter(config: &AppConfig, directives: Option<&str>) -> (EnvFilter, Option<String>) {
    match directives.map(EnvFilter::try_new) {
        Some(Ok(filter)) => (filter, None),
        Some(Err(e)) => (EnvFilter::new(config.log_level()), Some(e.to_string())),
        None => (EnvFilter::new(config.log_level()), None),
    }
}

/// Initialize tracing/logging for the application
///
/// Logs go to stderr so stdout carries only the run's report. Pipeline
/// events are logged under the `fintransform::events` target with their
/// title as a field; targets are shown from `-v` on so they stand out.
pub fn init_logging(config: &AppConfig) {
    let directives = std::env::var(LOG_ENV).ok();
    let (filter, rejected) = build_filter(config, directives.as_deref());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(config.verbose >= 1)
        .with_thread_ids(config.verbose >= 3)
        .with_line_number(config.verbose >= 3)
        .init();

    if let Some(reason) = rejected {
        warn!("Ignoring {}: {}", LOG_ENV, reason);
    }
    debug!("fintransform started with verbosity level: {}", config.verbose);
    trace!("Full CLI args: {:?}", std::env::args().collect::<Vec<_>>());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_follows_verbosity() {
        let (filter, rejected) = build_filter(&AppConfig::new(1), None);
        assert!(filter.to_string().to_lowercase().contains("fintransform=debug"));
        assert!(rejected.is_none());
    }

    #[test]
    fn test_env_directives_override_verbosity() {
        let (filter, rejected) = build_filter(&AppConfig::new(0), Some("fintransform::events=debug"));
        assert!(filter.to_string().to_lowercase().contains("fintransform::events=debug"));
        assert!(rejected.is_none());
    }

    #[test]
    fn test_invalid_env_directives_fall_back() {
        let (filter, rejected) = build_filter(&AppConfig::new(2), Some("fintransform=loud"));
        assert!(filter.to_string().to_lowercase().contains("fintransform=trace"));
        assert!(rejected.is_some());
    }
}
