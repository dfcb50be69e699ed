//! Localized label lookup

use crate::error::ResolutionError;
use std::collections::HashMap;
use tracing::warn;

/// Trait for resolving a localized label
pub trait TextResolver: Send + Sync {
    fn resolve(&self, collection: &str, key: &str) -> Result<String, ResolutionError>;
}

/// Resolve a label, falling back to `"<collection>/<key>"` on failure
pub fn resolve_or_fallback(resolver: &dyn TextResolver, collection: &str, key: &str) -> String {
    match resolver.resolve(collection, key) {
        Ok(label) => label,
        Err(e) => {
            warn!("{}, using fallback label", e);
            fallback_label(collection, key)
        }
    }
}

pub fn fallback_label(collection: &str, key: &str) -> String {
    format!("{}/{}", collection, key)
}

/// Resolver backed by an in-memory catalog of collections
#[derive(Debug, Clone, Default)]
pub struct CatalogResolver {
    collections: HashMap<String, HashMap<String, String>>,
}

impl CatalogResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_catalog(collections: HashMap<String, HashMap<String, String>>) -> Self {
        Self { collections }
    }

    /// Add a single label
    pub fn with_label(
        mut self,
        collection: impl Into<String>,
        key: impl Into<String>,
        label: impl Into<String>,
    ) -> Self {
        self.collections
            .entry(collection.into())
            .or_default()
            .insert(key.into(), label.into());
        self
    }
}

impl TextResolver for CatalogResolver {
    fn resolve(&self, collection: &str, key: &str) -> Result<String, ResolutionError> {
        self.collections
            .get(collection)
            .and_then(|labels| labels.get(key))
            .cloned()
            .ok_or_else(|| ResolutionError {
                collection: collection.to_string(),
                key: key.to_string(),
            })
    }
}
