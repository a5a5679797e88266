//! No-op knowledge index: disables retrieval entirely.

use async_trait::async_trait;
use bariatric_core::error::KnowledgeError;
use bariatric_core::knowledge::KnowledgeIndex;

/// An index with no passages. Every query returns zero hits.
pub struct NoopIndex;

#[async_trait]
impl KnowledgeIndex for NoopIndex {
    fn name(&self) -> &str {
        "none"
    }

    async fn query(&self, _text: &str, _k: usize) -> Result<Vec<String>, KnowledgeError> {
        Ok(Vec::new())
    }

    async fn count(&self) -> Result<usize, KnowledgeError> {
        Ok(0)
    }
}
