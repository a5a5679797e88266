//! Message domain types.
//!
//! These are the value objects that flow through a turn:
//! user text arrives → pipeline stages enrich it → the language model answers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The role of a message sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The patient
    User,
    /// The assistant
    Assistant,
    /// System instructions (persona, context)
    System,
}

/// A single role-tagged message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique message ID
    pub id: String,

    /// Who sent this message
    pub role: Role,

    /// The text content
    pub content: String,

    /// Timestamp
    pub timestamp: DateTime<Utc>,
}

impl Message {
    fn with_role(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(Role::User, content)
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_role(Role::Assistant, content)
    }

    /// Create a new system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role(Role::System, content)
    }
}

/// The content of the most recent message with the given role.
pub fn last_with_role(messages: &[Message], role: Role) -> Option<&str> {
    messages
        .iter()
        .rev()
        .find(|m| m.role == role)
        .map(|m| m.content.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_user_message() {
        let msg = Message::user("Can I eat rice yet?");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.content, "Can I eat rice yet?");
    }

    #[test]
    fn role_serializes_lowercase() {
        let msg = Message::assistant("Try cottage cheese.");
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"assistant\""));
    }

    #[test]
    fn last_with_role_finds_latest() {
        let messages = vec![
            Message::user("first"),
            Message::assistant("reply one"),
            Message::user("second"),
            Message::assistant("reply two"),
            Message::user("third"),
        ];
        assert_eq!(last_with_role(&messages, Role::Assistant), Some("reply two"));
        assert_eq!(last_with_role(&messages, Role::User), Some("third"));
        assert_eq!(last_with_role(&messages, Role::System), None);
    }
}
