//! Resolver without any labels

use crate::abstractions::TextResolver;
use crate::error::ResolutionError;

#[derive(Debug, Clone, Copy, Default)]
pub struct FailingResolver;

impl TextResolver for FailingResolver {
    fn resolve(&self, collection: &str, key: &str) -> Result<String, ResolutionError> {
        Err(ResolutionError {
            collection: collection.to_string(),
            key: key.to_string(),
        })
    }
}
