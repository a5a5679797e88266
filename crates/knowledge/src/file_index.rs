//! File-backed knowledge index: JSON-lines passages built offline.
//!
//! Each line is a JSON-encoded `Passage`:
//! `{"id": "...", "content": "...", "source": "...", "embedding": [...]}`.
//! `source` and `embedding` are optional.
//!
//! The file is read once at construction. When an embedding provider is
//! attached and the corpus carries embeddings, queries fuse keyword and
//! vector rankings; otherwise they are keyword-only.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use bariatric_core::error::KnowledgeError;
use bariatric_core::knowledge::{KnowledgeIndex, Passage};
use bariatric_core::provider::{EmbeddingRequest, Provider};
use tracing::{debug, warn};

use crate::keyword::keyword_search;
use crate::vector::{reciprocal_rank_fusion, vector_search};

const RRF_K: u32 = 60;

/// A read-only passage index loaded from a JSONL file.
pub struct FileIndex {
    path: PathBuf,
    passages: Vec<Passage>,
    embedder: Option<(Arc<dyn Provider>, String)>,
}

impl FileIndex {
    /// Load the index at `path`.
    ///
    /// A missing or unreadable file is `KnowledgeError::Unavailable`.
    /// Corrupted lines are skipped.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, KnowledgeError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| {
            KnowledgeError::Unavailable(format!("{}: {e}", path.display()))
        })?;
        let passages = Self::parse(&content);
        debug!(path = %path.display(), count = passages.len(), "Knowledge index loaded");
        Ok(Self {
            path,
            passages,
            embedder: None,
        })
    }

    /// Attach an embedding provider for vector search.
    pub fn with_embedder(mut self, provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        self.embedder = Some((provider, model.into()));
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether any passage carries a precomputed embedding.
    pub fn has_embeddings(&self) -> bool {
        self.passages.iter().any(|p| p.embedding.is_some())
    }

    fn parse(content: &str) -> Vec<Passage> {
        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| match serde_json::from_str::<Passage>(line) {
                Ok(passage) => Some(passage),
                Err(e) => {
                    warn!(error = %e, "Skipping corrupted knowledge passage");
                    None
                }
            })
            .collect()
    }

    async fn embed_query(&self, text: &str) -> Option<Vec<f32>> {
        let (provider, model) = self.embedder.as_ref()?;
        if !self.has_embeddings() {
            return None;
        }
        let request = EmbeddingRequest {
            model: model.clone(),
            inputs: vec![text.to_string()],
        };
        match provider.embed(request).await {
            Ok(resp) => resp.embeddings.into_iter().next(),
            Err(e) => {
                warn!(error = %e, "Query embedding failed, using keyword search only");
                None
            }
        }
    }
}

#[async_trait]
impl KnowledgeIndex for FileIndex {
    fn name(&self) -> &str {
        "file"
    }

    async fn query(&self, text: &str, k: usize) -> Result<Vec<String>, KnowledgeError> {
        let keyword = keyword_search(&self.passages, text, k);

        let ranked = match self.embed_query(text).await {
            Some(embedding) => {
                let vector = vector_search(&self.passages, &embedding, k, 0.0);
                reciprocal_rank_fusion(&keyword, &vector, RRF_K, k)
            }
            None => keyword,
        };

        Ok(ranked.into_iter().map(|p| p.content.clone()).collect())
    }

    async fn count(&self) -> Result<usize, KnowledgeError> {
        Ok(self.passages.len())
    }
}
