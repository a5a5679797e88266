//! Knowledge Retriever stage.

use std::sync::Arc;

use async_trait::async_trait;
use bariatric_core::knowledge::KnowledgeIndex;
use tracing::{debug, warn};

use super::Stage;
use crate::state::{TurnState, TurnUpdate};
use crate::text::is_greeting;

pub const DEFAULT_TOP_K: usize = 5;
pub const DEFAULT_MIN_QUERY_CHARS: usize = 8;

pub struct Retriever {
    index: Arc<dyn KnowledgeIndex>,
    top_k: usize,
    min_query_chars: usize,
}

impl Retriever {
    pub fn new(index: Arc<dyn KnowledgeIndex>) -> Self {
        Self {
            index,
            top_k: DEFAULT_TOP_K,
            min_query_chars: DEFAULT_MIN_QUERY_CHARS,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    pub fn with_min_query_chars(mut self, min_query_chars: usize) -> Self {
        self.min_query_chars = min_query_chars;
        self
    }

    /// Top-`k` passages joined by blank lines, or an empty string.
    ///
    /// Short input, bare greetings, zero hits and index failures all
    /// yield empty context.
    pub async fn retrieve(&self, query: &str, k: usize) -> String {
        let query = query.trim();
        if query.chars().count() < self.min_query_chars || is_greeting(query) {
            debug!("Skipping retrieval for short or greeting input");
            return String::new();
        }

        match self.index.query(query, k).await {
            Ok(hits) => {
                debug!(index = self.index.name(), hits = hits.len(), "Retrieved context");
                hits.iter()
                    .map(|h| h.trim())
                    .filter(|h| !h.is_empty())
                    .collect::<Vec<_>>()
                    .join("\n\n")
            }
            Err(e) => {
                warn!(index = self.index.name(), error = %e, "Knowledge index failed, continuing without context");
                String::new()
            }
        }
    }
}

#[async_trait]
impl Stage for Retriever {
    fn name(&self) -> &'static str {
        "research"
    }

    async fn run(&self, state: &TurnState) -> TurnUpdate {
        let context = self.retrieve(state.user_text(), self.top_k).await;
        TurnUpdate {
            clinical_context: (!context.is_empty()).then_some(context),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::FixedIndex;

    const QUESTION: &str = "How much protein do I need after a gastric sleeve?";

    #[tokio::test]
    async fn joins_hits_with_blank_lines() {
        let index = Arc::new(FixedIndex::new([
            "Aim for 60-80 g protein daily.",
            "Sip, do not gulp.",
        ]));
        let retriever = Retriever::new(index);

        let context = retriever.retrieve(QUESTION, 5).await;
        assert_eq!(context, "Aim for 60-80 g protein daily.\n\nSip, do not gulp.");
    }

    #[tokio::test]
    async fn skips_short_and_greeting_input() {
        let index = Arc::new(FixedIndex::new(["passage"]));
        let retriever = Retriever::new(index.clone());

        assert_eq!(retriever.retrieve("hi", 5).await, "");
        assert_eq!(retriever.retrieve("hello there friend", 5).await, "");
        assert_eq!(index.query_count(), 0);
    }

    #[tokio::test]
    async fn index_failure_is_empty_context() {
        let retriever = Retriever::new(Arc::new(FixedIndex::failing()));
        assert_eq!(retriever.retrieve(QUESTION, 5).await, "");
    }

    #[tokio::test]
    async fn zero_hits_attach_nothing() {
        let retriever = Retriever::new(Arc::new(FixedIndex::new(Vec::<String>::new())));
        let update = retriever.run(&TurnState::new("1", QUESTION)).await;
        assert!(update.clinical_context.is_none());
    }

    #[tokio::test]
    async fn same_query_same_context() {
        let retriever = Retriever::new(Arc::new(FixedIndex::new(["a", "b", "c"]))).with_top_k(2);
        let first = retriever.run(&TurnState::new("1", QUESTION)).await;
        let second = retriever.run(&TurnState::new("1", QUESTION)).await;
        assert_eq!(first.clinical_context, second.clinical_context);
        assert_eq!(first.clinical_context.as_deref(), Some("a\n\nb"));
    }
}
