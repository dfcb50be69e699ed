//! Application configuration
//!
//! Settings of the binary itself, as opposed to the pipeline settings in
//! [`crate::config`].

use std::path::PathBuf;

/// Application configuration structure
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    /// Verbosity level for logging
    pub verbose: u8,
    /// Pipeline configuration file, if one was given
    pub config_path: Option<PathBuf>,
}

impl AppConfig {
    pub fn new(verbose: u8) -> Self {
        Self {
            verbose,
            config_path: None,
        }
    }

    pub fn with_config_path(mut self, path: Option<PathBuf>) -> Self {
        self.config_path = path;
        self
    }

    /// Get the log level string based on verbosity
    ///
    /// `-v` raises only this crate's own targets, pipeline events included,
    /// and leaves dependencies at `info`.
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "info,fintransform=debug",
            2 => "debug,fintransform=trace",
            _ => "trace",
        }
    }
}
