//! Background long-term memory: one completion turns the previous memory
//! and the latest exchange into a small JSON summary, written to the
//! profile store. Failures are logged and the update is skipped.
//!
//! The stored summary is read back at the start of a turn whose request
//! carries none.

use std::sync::Arc;

use bariatric_core::error::Error;
use bariatric_core::message::Message;
use bariatric_core::profile::ProfileStore;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::background::BackgroundTask;
use crate::llm::LanguageModel;

const SUMMARY_KEYS: [&str; 3] = ["preferences", "recent_meals", "recent_recommendations"];

const SUMMARY_PROMPT: &str = "You maintain a short memory about a bariatric surgery patient. \
Merge the previous memory with the latest exchange and return ONLY a JSON object with the keys \
\"preferences\", \"recent_meals\" and \"recent_recommendations\", each a list of short strings. \
Keep at most five items per list and drop anything stale.";

/// Input for one memory update.
#[derive(Debug, Clone)]
pub struct MemoryJob {
    pub user_id: String,
    pub previous: Option<String>,
    pub user_text: String,
    pub assistant_text: String,
}

pub struct MemorySummarizer {
    llm: LanguageModel,
    store: Arc<dyn ProfileStore>,
    fallback_user_id: String,
}

impl MemorySummarizer {
    pub fn new(
        llm: LanguageModel,
        store: Arc<dyn ProfileStore>,
        fallback_user_id: impl Into<String>,
    ) -> Self {
        Self {
            llm,
            store,
            fallback_user_id: fallback_user_id.into(),
        }
    }

    /// Produce the new memory string.
    pub async fn summarize(
        &self,
        previous: Option<&str>,
        user_text: &str,
        assistant_text: &str,
    ) -> Result<String, Error> {
        let exchange = format!(
            "Previous memory:\n{}\n\nPatient: {user_text}\nAssistant: {assistant_text}",
            previous.filter(|p| !p.trim().is_empty()).unwrap_or("{}")
        );
        let raw = self
            .llm
            .complete_text(vec![Message::system(SUMMARY_PROMPT), Message::user(exchange)])
            .await?;
        parse_summary(&raw)
    }

    /// The stored memory for `user_id`. An unreachable store reads as no memory.
    pub async fn recall(&self, user_id: &str) -> Option<String> {
        let key = store_key(user_id, &self.fallback_user_id);
        match self.store.get_memory(&key).await {
            Ok(memory) => memory,
            Err(e) => {
                warn!(user_id, store_key = %key, error = %e, "Memory read failed");
                None
            }
        }
    }

    /// Summarize and persist. Errors are returned to the caller.
    pub async fn update(&self, job: &MemoryJob) -> Result<(), Error> {
        let memory = self
            .summarize(job.previous.as_deref(), &job.user_text, &job.assistant_text)
            .await?;
        let key = store_key(&job.user_id, &self.fallback_user_id);
        self.store.put_memory(&key, &memory).await?;
        info!(user_id = %job.user_id, store_key = %key, "Memory updated");
        Ok(())
    }

    /// Run `update` off the response path. Failures are logged and dropped.
    pub fn spawn(self: Arc<Self>, job: MemoryJob) -> BackgroundTask {
        BackgroundTask::spawn("memory_summary", async move {
            if let Err(e) = self.update(&job).await {
                warn!(user_id = %job.user_id, error = %e, "Memory update skipped");
            }
        })
    }
}

/// The profile store is keyed by numeric id; use the last run of digits in
/// `user_id`, or the fallback when there is none.
pub fn store_key(user_id: &str, fallback: &str) -> String {
    let last_run = user_id
        .split(|c: char| !c.is_ascii_digit())
        .filter(|run| !run.is_empty())
        .last();
    match last_run {
        Some(digits) => digits.to_string(),
        None => {
            debug!(user_id, "Non-numeric user id, using fallback memory key");
            fallback.to_string()
        }
    }
}

/// Pull the JSON object out of a completion and normalize its keys.
pub fn parse_summary(raw: &str) -> Result<String, Error> {
    let unfenced = strip_code_fence(raw);
    let (Some(start), Some(end)) = (unfenced.find('{'), unfenced.rfind('}')) else {
        return Err(Error::Internal("memory summary contained no JSON object".into()));
    };
    if end < start {
        return Err(Error::Internal("memory summary contained no JSON object".into()));
    }

    let value: Value = serde_json::from_str(&unfenced[start..=end])?;
    let Value::Object(mut object) = value else {
        return Err(Error::Internal("memory summary is not an object".into()));
    };
    for key in SUMMARY_KEYS {
        object
            .entry(key)
            .or_insert_with(|| Value::Array(Vec::new()));
    }
    Ok(serde_json::to_string(&Value::Object(object))?)
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // drop the info string ("json") on the fence line
    let rest = rest.split_once('\n').map_or(rest, |(_, body)| body);
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
mod tests {
    use bariatric_tools::InMemoryProfileStore;

    use super::*;
    use crate::test_helpers::ScriptedProvider;

    #[test]
    fn store_key_extracts_digits() {
        assert_eq!(store_key("42", "1"), "42");
        assert_eq!(store_key("user-17", "1"), "17");
        assert_eq!(store_key("p3-visit-88", "1"), "88");
        assert_eq!(store_key("anonymous", "1"), "1");
    }

    #[test]
    fn parses_fenced_summary() {
        let raw = "```json\n{\"preferences\": [\"savory\"]}\n```";
        let parsed: Value = serde_json::from_str(&parse_summary(raw).unwrap()).unwrap();
        assert_eq!(parsed["preferences"][0], "savory");
        assert!(parsed["recent_meals"].as_array().unwrap().is_empty());
        assert!(parsed["recent_recommendations"].is_array());
    }

    #[test]
    fn parses_summary_with_chatter() {
        let raw = "Here is the memory: {\"recent_meals\": [\"eggs\"]} hope that helps";
        let parsed: Value = serde_json::from_str(&parse_summary(raw).unwrap()).unwrap();
        assert_eq!(parsed["recent_meals"][0], "eggs");
    }

    #[test]
    fn rejects_non_json() {
        assert!(parse_summary("no memory today").is_err());
        assert!(parse_summary("{not json}").is_err());
        assert!(parse_summary("[1, 2]").is_err());
    }

    #[tokio::test]
    async fn spawned_update_writes_memory() {
        let store = Arc::new(InMemoryProfileStore::default());
        let provider = Arc::new(ScriptedProvider::new([
            r#"{"preferences":["no dairy"],"recent_meals":["tofu"],"recent_recommendations":[]}"#,
        ]));
        let summarizer = Arc::new(MemorySummarizer::new(
            LanguageModel::new(provider, "m"),
            store.clone(),
            "1",
        ));

        summarizer
            .spawn(MemoryJob {
                user_id: "user-9".into(),
                previous: None,
                user_text: "I had tofu".into(),
                assistant_text: "Logged.".into(),
            })
            .wait()
            .await;

        let memory = store.memory("9").await.unwrap();
        assert!(memory.contains("no dairy"));
    }

    #[tokio::test]
    async fn recall_reads_the_keyed_memory() {
        let store = Arc::new(InMemoryProfileStore::default());
        store.put_memory("9", r#"{"preferences":["no dairy"]}"#).await.unwrap();
        let summarizer = MemorySummarizer::new(
            LanguageModel::new(Arc::new(ScriptedProvider::failing()), "m"),
            store,
            "1",
        );

        let memory = summarizer.recall("user-9").await.unwrap();
        assert!(memory.contains("no dairy"));
        assert!(summarizer.recall("user-10").await.is_none());
    }

    #[tokio::test]
    async fn failed_completion_skips_write() {
        let store = Arc::new(InMemoryProfileStore::default());
        let summarizer = Arc::new(MemorySummarizer::new(
            LanguageModel::new(Arc::new(ScriptedProvider::failing()), "m"),
            store.clone(),
            "1",
        ));

        summarizer
            .spawn(MemoryJob {
                user_id: "9".into(),
                previous: Some("{}".into()),
                user_text: "hi".into(),
                assistant_text: "hello".into(),
            })
            .wait()
            .await;

        assert!(store.memory("9").await.is_none());
    }
}
