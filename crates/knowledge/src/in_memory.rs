//! In-memory keyword index: useful for testing and small corpora.

use std::sync::Arc;

use async_trait::async_trait;
use bariatric_core::error::KnowledgeError;
use bariatric_core::knowledge::{KnowledgeIndex, Passage};
use tokio::sync::RwLock;

use crate::keyword::keyword_search;

/// A keyword index held in a Vec.
pub struct InMemoryIndex {
    passages: Arc<RwLock<Vec<Passage>>>,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self {
            passages: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn with_passages(passages: Vec<Passage>) -> Self {
        Self {
            passages: Arc::new(RwLock::new(passages)),
        }
    }

    /// Add a passage. Queries already in flight see either the old or new corpus.
    pub async fn add(&self, passage: Passage) {
        self.passages.write().await.push(passage);
    }
}

impl Default for InMemoryIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KnowledgeIndex for InMemoryIndex {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn query(&self, text: &str, k: usize) -> Result<Vec<String>, KnowledgeError> {
        let passages = self.passages.read().await;
        Ok(keyword_search(&passages, text, k)
            .into_iter()
            .map(|p| p.content.clone())
            .collect())
    }

    async fn count(&self) -> Result<usize, KnowledgeError> {
        Ok(self.passages.read().await.len())
    }
}
