//! The rolling window of recent exchanges carried between turns.
//!
//! Two parallel sequences, each capped at `WINDOW` entries with the oldest
//! evicted first. Callers persist the serialized form and send it back on
//! the next turn; anything unparseable is treated as an empty window.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Maximum exchanges kept.
pub const WINDOW: usize = 5;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationLog {
    #[serde(default, alias = "recentUserPrompts")]
    pub recent_user_prompts: VecDeque<String>,

    #[serde(default, alias = "recentAssistantResponses")]
    pub recent_assistant_responses: VecDeque<String>,
}

impl ConversationLog {
    /// Parse a serialized log. Absent, empty, or malformed input is an
    /// empty window.
    pub fn parse(raw: Option<&str>) -> Self {
        let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
            return Self::default();
        };
        match serde_json::from_str::<Self>(raw) {
            Ok(log) => log.normalized(),
            Err(e) => {
                debug!(error = %e, "Discarding malformed conversation log");
                Self::default()
            }
        }
    }

    /// Accept the log either as an embedded JSON object or as a string
    /// holding serialized JSON.
    pub fn from_value(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::String(s) => Self::parse(Some(s)),
            serde_json::Value::Object(_) => serde_json::from_value::<Self>(value.clone())
                .map(Self::normalized)
                .unwrap_or_default(),
            _ => Self::default(),
        }
    }

    /// Append one exchange and evict down to the window.
    pub fn push(&mut self, user_text: impl Into<String>, assistant_text: impl Into<String>) {
        self.recent_user_prompts.push_back(user_text.into());
        self.recent_assistant_responses.push_back(assistant_text.into());
        self.enforce_window();
    }

    pub fn last_assistant(&self) -> Option<&str> {
        self.recent_assistant_responses
            .back()
            .map(String::as_str)
            .filter(|s| !s.trim().is_empty())
    }

    pub fn len(&self) -> usize {
        self.recent_user_prompts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recent_user_prompts.is_empty()
    }

    /// Recent exchanges, oldest first.
    pub fn exchanges(&self) -> impl Iterator<Item = (&str, &str)> {
        self.recent_user_prompts
            .iter()
            .zip(self.recent_assistant_responses.iter())
            .map(|(u, a)| (u.as_str(), a.as_str()))
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".into())
    }

    /// Pair up mismatched sequences (keeping the most recent entries) and
    /// apply the window.
    fn normalized(mut self) -> Self {
        let paired = self
            .recent_user_prompts
            .len()
            .min(self.recent_assistant_responses.len());
        while self.recent_user_prompts.len() > paired {
            self.recent_user_prompts.pop_front();
        }
        while self.recent_assistant_responses.len() > paired {
            self.recent_assistant_responses.pop_front();
        }
        self.enforce_window();
        self
    }

    fn enforce_window(&mut self) {
        while self.recent_user_prompts.len() > WINDOW {
            self.recent_user_prompts.pop_front();
        }
        while self.recent_assistant_responses.len() > WINDOW {
            self.recent_assistant_responses.pop_front();
        }
    }
}

/// Append an exchange to a serialized log and return the new serialized log.
pub fn append(log: Option<&str>, user_text: &str, assistant_text: &str) -> String {
    let mut parsed = ConversationLog::parse(log);
    parsed.push(user_text, assistant_text);
    parsed.to_json()
}
