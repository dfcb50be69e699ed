//! Source that never delivers

use crate::abstractions::Source;
use crate::error::SourceError;
use crate::pipeline::types::RawUnit;
use async_trait::async_trait;

#[derive(Debug, Clone)]
pub struct FailingSource {
    reason: String,
}

impl FailingSource {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl Default for FailingSource {
    fn default() -> Self {
        Self::new("source offline")
    }
}

#[async_trait]
impl Source for FailingSource {
    async fn fetch_all(&self) -> Result<Vec<RawUnit>, SourceError> {
        Err(SourceError::Unavailable(self.reason.clone()))
    }

    fn describe(&self) -> String {
        "failing source".to_string()
    }
}
