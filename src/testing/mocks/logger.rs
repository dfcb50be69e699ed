//! Logger that keeps every event in memory

use crate::abstractions::PipelineLogger;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub level: LogLevel,
    pub title: String,
    pub details: String,
}

#[derive(Debug, Default)]
pub struct RecordingLogger {
    entries: Mutex<Vec<LogEntry>>,
}

impl RecordingLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    /// Details of every debug event with the given title, in log order
    pub fn debug_details(&self, title: &str) -> Vec<String> {
        self.details(LogLevel::Debug, title)
    }

    /// Details of every error event with the given title, in log order
    pub fn error_details(&self, title: &str) -> Vec<String> {
        self.details(LogLevel::Error, title)
    }

    pub fn count(&self, title: &str) -> usize {
        self.entries().iter().filter(|e| e.title == title).count()
    }

    fn details(&self, level: LogLevel, title: &str) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|e| e.level == level && e.title == title)
            .map(|e| e.details)
            .collect()
    }

    fn record(&self, level: LogLevel, title: &str, details: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(LogEntry {
                level,
                title: title.to_string(),
                details: details.to_string(),
            });
        }
    }
}

impl PipelineLogger for RecordingLogger {
    fn debug(&self, title: &str, details: &str) {
        self.record(LogLevel::Debug, title, details);
    }

    fn error(&self, title: &str, details: &str) {
        self.record(LogLevel::Error, title, details);
    }
}
