//! Pipeline configuration
//!
//! Settings come from three layers, later layers winning: a TOML file, the
//! `FINTRANSFORM_*` environment variables, and command-line flags applied by
//! the binary. Every section is optional.

use crate::abstractions::CatalogResolver;
use crate::error::PipelineError;
use crate::pipeline::validator::AmountPolicy;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

pub const ENV_MAX_PARALLEL_MAPPERS: &str = "FINTRANSFORM_MAX_PARALLEL_MAPPERS";
pub const ENV_MAX_PARALLEL_REDUCERS: &str = "FINTRANSFORM_MAX_PARALLEL_REDUCERS";
pub const ENV_AMOUNT_POLICY: &str = "FINTRANSFORM_AMOUNT_POLICY";

/// Complete configuration of a pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub pipeline: ExecutionConfig,
    pub target: TargetConfig,
    pub summary: SummaryConfig,
    /// Label catalog: collection -> key -> label
    pub labels: HashMap<String, HashMap<String, String>>,
}

/// Concurrency and validation settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    pub max_parallel_mappers: usize,
    pub max_parallel_reducers: usize,
    pub amount_policy: AmountPolicy,
}

/// Shape of the entity created for each record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    pub record_type: String,
    pub key_field: String,
    pub amount_field: String,
}

/// Where the summary label comes from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryConfig {
    pub collection: String,
    pub label_key: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let summary = SummaryConfig::default();
        let mut labels = HashMap::new();
        labels.insert(
            summary.collection.clone(),
            HashMap::from([(summary.label_key.clone(), "Total processed".to_string())]),
        );

        Self {
            pipeline: ExecutionConfig::default(),
            target: TargetConfig::default(),
            summary,
            labels,
        }
    }
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            max_parallel_mappers: default_parallelism(),
            max_parallel_reducers: 4,
            amount_policy: AmountPolicy::default(),
        }
    }
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            record_type: "customrecord_financial_data".to_string(),
            key_field: "custrecord_ext_trans_id".to_string(),
            amount_field: "custrecord_amount".to_string(),
        }
    }
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            collection: "myTranslations".to_string(),
            label_key: "TOTAL_PROCESSED".to_string(),
        }
    }
}

/// One mapper per available core
fn default_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|p| p.get())
        .unwrap_or(4)
}

impl PipelineConfig {
    /// Parse a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse pipeline configuration")
    }

    /// Load a TOML file and apply environment overrides
    pub async fn load(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let mut config = Self::from_toml_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        config.merge_env_vars()?;
        debug!("Loaded pipeline configuration from {}", path.display());
        Ok(config)
    }

    /// Defaults plus environment overrides
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.merge_env_vars()?;
        Ok(config)
    }

    pub fn merge_env_vars(&mut self) -> Result<()> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from any variable lookup
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_MAX_PARALLEL_MAPPERS) {
            self.pipeline.max_parallel_mappers = value
                .trim()
                .parse()
                .with_context(|| format!("{} must be a number", ENV_MAX_PARALLEL_MAPPERS))?;
        }
        if let Some(value) = lookup(ENV_MAX_PARALLEL_REDUCERS) {
            self.pipeline.max_parallel_reducers = value
                .trim()
                .parse()
                .with_context(|| format!("{} must be a number", ENV_MAX_PARALLEL_REDUCERS))?;
        }
        if let Some(value) = lookup(ENV_AMOUNT_POLICY) {
            self.pipeline.amount_policy = value.parse().map_err(anyhow::Error::msg)?;
        }
        Ok(())
    }

    /// Check that the configuration can drive a run
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.pipeline.max_parallel_mappers == 0 {
            return Err(invalid("pipeline.max_parallel_mappers", "must be greater than 0"));
        }
        if self.pipeline.max_parallel_reducers == 0 {
            return Err(invalid("pipeline.max_parallel_reducers", "must be greater than 0"));
        }

        let identifiers = [
            ("target.record_type", &self.target.record_type),
            ("target.key_field", &self.target.key_field),
            ("target.amount_field", &self.target.amount_field),
            ("summary.collection", &self.summary.collection),
            ("summary.label_key", &self.summary.label_key),
        ];
        for (field, value) in identifiers {
            if value.trim().is_empty() {
                return Err(invalid(field, "must not be empty"));
            }
        }

        if self.target.key_field == self.target.amount_field {
            return Err(invalid(
                "target.amount_field",
                "must differ from target.key_field",
            ));
        }

        Ok(())
    }

    /// Build a resolver over the configured label catalog
    pub fn label_catalog(&self) -> CatalogResolver {
        CatalogResolver::from_catalog(self.labels.clone())
    }
}

fn invalid(field: &str, reason: &str) -> PipelineError {
    PipelineError::InvalidConfiguration {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}
