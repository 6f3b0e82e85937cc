//! Database schema and persisted conversation types

use serde::{Deserialize, Serialize};
use std::fmt;

/// SQL schema for initialization
pub const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS kv_store (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
";

/// Default durable key for the conversation history
pub const HISTORY_KEY: &str = "chatHistory";

/// Who authored a conversation entry
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    User,
    Bot,
    Error,
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryKind::User => write!(f, "user"),
            EntryKind::Bot => write!(f, "bot"),
            EntryKind::Error => write!(f, "error"),
        }
    }
}

/// One line of conversation.
///
/// Serialized as `{"type": "user" | "bot" | "error", "text": "..."}`, which is
/// both the persisted snapshot format and the `history` wire format.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConversationEntry {
    #[serde(rename = "type")]
    pub kind: EntryKind,
    pub text: String,
}

impl ConversationEntry {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            kind: EntryKind::User,
            text: text.into(),
        }
    }

    pub fn bot(text: impl Into<String>) -> Self {
        Self {
            kind: EntryKind::Bot,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            kind: EntryKind::Error,
            text: text.into(),
        }
    }
}
