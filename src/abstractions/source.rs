//! Raw record sources
//!
//! A source delivers the complete ordered sequence of raw units for one run.
//! Failing to deliver is fatal to the run; individual units are not inspected
//! here, so a malformed line in a JSON-lines file surfaces later, in the map
//! stage.

use crate::error::SourceError;
use crate::pipeline::types::RawUnit;
use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Trait for producing the raw units of a run
#[async_trait]
pub trait Source: Send + Sync {
    /// Fetch every unit, in order
    async fn fetch_all(&self) -> Result<Vec<RawUnit>, SourceError>;

    /// Human-readable name for logs
    fn describe(&self) -> String {
        "source".to_string()
    }
}

/// Source backed by an in-memory list of units
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    units: Vec<RawUnit>,
}

impl StaticSource {
    pub fn new(units: Vec<RawUnit>) -> Self {
        Self { units }
    }

    /// Build a source from JSON values, one unit per value
    pub fn from_values(values: &[Value]) -> Self {
        Self {
            units: values.iter().map(RawUnit::from_value).collect(),
        }
    }
}

#[async_trait]
impl Source for StaticSource {
    async fn fetch_all(&self) -> Result<Vec<RawUnit>, SourceError> {
        Ok(self.units.clone())
    }

    fn describe(&self) -> String {
        format!("static source ({} units)", self.units.len())
    }
}

/// Layout of a source file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    /// A single JSON array; each element is one unit
    JsonArray,
    /// One unit per non-blank line
    JsonLines,
}

impl SourceFormat {
    /// Pick the format from the file extension
    pub fn detect(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("jsonl") | Some("ndjson") => SourceFormat::JsonLines,
            _ => SourceFormat::JsonArray,
        }
    }
}

/// Source reading units from a file on disk
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
    format: SourceFormat,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let format = SourceFormat::detect(&path);
        Self { path, format }
    }

    /// Override the detected format
    pub fn with_format(mut self, format: SourceFormat) -> Self {
        self.format = format;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> SourceFormat {
        self.format
    }
}

#[async_trait]
impl Source for JsonFileSource {
    async fn fetch_all(&self) -> Result<Vec<RawUnit>, SourceError> {
        let content =
            tokio::fs::read_to_string(&self.path)
                .await
                .map_err(|source| SourceError::Io {
                    path: self.path.display().to_string(),
                    source,
                })?;

        let units = parse_document(&content, self.format, &self.path)?;
        debug!(
            "Read {} units from {} ({:?})",
            units.len(),
            self.path.display(),
            self.format
        );
        Ok(units)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Split a document into raw units
pub fn parse_document(
    content: &str,
    format: SourceFormat,
    path: &Path,
) -> Result<Vec<RawUnit>, SourceError> {
    match format {
        SourceFormat::JsonLines => Ok(content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(RawUnit::from)
            .collect()),
        SourceFormat::JsonArray => {
            let values: Vec<Value> =
                serde_json::from_str(content).map_err(|e| SourceError::InvalidDocument {
                    path: path.display().to_string(),
                    reason: e.to_string(),
                })?;
            Ok(values.iter().map(RawUnit::from_value).collect())
        }
    }
}
