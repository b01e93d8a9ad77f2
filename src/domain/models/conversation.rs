//! Conversations awaiting (or done with) signal extraction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One message of a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
    pub message_index: i64,
    pub conversation_turn: i64,
    #[serde(default)]
    pub redacted: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub conversation_id: Uuid,
    pub user_id: Uuid,
    pub model: Option<String>,
    pub language: Option<String>,
    pub total_turns: i64,
    /// Ordered by `message_index`
    pub messages: Vec<Message>,
    pub processed: bool,
    pub created_at: DateTime<Utc>,
}

impl Conversation {
    /// Render messages as `[ROLE]: content` blocks, truncating each message
    /// to `max_chars` characters.
    pub fn transcript(&self, max_chars: usize) -> String {
        self.messages
            .iter()
            .map(|m| {
                let role = if m.role.is_empty() { "unknown" } else { &m.role };
                let content = if m.content.chars().count() > max_chars {
                    let cut: String = m.content.chars().take(max_chars).collect();
                    format!("{cut}... [truncated]")
                } else {
                    m.content.clone()
                };
                format!("[{}]: {}", role.to_uppercase(), content)
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// True when no message carries any non-whitespace content.
    pub fn is_blank(&self) -> bool {
        self.messages.iter().all(|m| m.content.trim().is_empty())
    }
}

/// One line of a JSONL conversation dataset.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DatasetRecord {
    pub conversation_id: Option<serde_json::Value>,
    pub user_id: Option<serde_json::Value>,
    pub model: Option<String>,
    pub language: Option<String>,
    pub role: Option<String>,
    pub content: Option<String>,
    pub message_index: i64,
    pub conversation_turn: i64,
    pub redacted: bool,
}

impl DatasetRecord {
    pub fn conversation_key(&self) -> String {
        id_text(self.conversation_id.as_ref())
    }

    pub fn user_key(&self) -> String {
        id_text(self.user_id.as_ref())
    }

    pub fn to_message(&self) -> Message {
        Message {
            role: self.role.clone().unwrap_or_default(),
            content: self.content.clone().unwrap_or_default(),
            message_index: self.message_index,
            conversation_turn: self.conversation_turn,
            redacted: self.redacted,
        }
    }
}

fn id_text(value: Option<&serde_json::Value>) -> String {
    match value {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(serde_json::Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

/// Map an external identifier onto a UUID: parsed directly when it already
/// is one, otherwise derived deterministically (UUIDv5, DNS namespace).
pub fn stable_uuid(key: &str) -> Uuid {
    Uuid::parse_str(key).unwrap_or_else(|_| Uuid::new_v5(&Uuid::NAMESPACE_DNS, key.as_bytes()))
}
