//! Knowledge index trait: read-only similarity search over clinical
//! reference passages.
//!
//! The index is built offline; at request time it only answers queries.
//! Implementations: file-backed (JSONL, optional embeddings), in-memory
//! keyword index (testing, small corpora), none (no-op).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::KnowledgeError;

/// A single indexed passage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Passage {
    /// Stable passage ID
    pub id: String,

    /// The passage text
    pub content: String,

    /// Source document (file name, guideline title)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    /// Precomputed embedding, when the offline build produced one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

impl Passage {
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            source: None,
            embedding: None,
        }
    }
}

/// The core KnowledgeIndex trait.
#[async_trait]
pub trait KnowledgeIndex: Send + Sync {
    /// The index name (e.g., "file", "in_memory", "none").
    fn name(&self) -> &str;

    /// Return the text of the top-`k` passages for `text`, best first.
    async fn query(&self, text: &str, k: usize) -> Result<Vec<String>, KnowledgeError>;

    /// Number of indexed passages.
    async fn count(&self) -> Result<usize, KnowledgeError>;
}
