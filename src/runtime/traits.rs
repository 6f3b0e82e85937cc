//! Trait abstractions for runtime I/O
//!
//! These traits enable testing the executor with mock implementations.

use crate::client::{ApiError, AskRequest};
use crate::db::{ConversationEntry, Database};
use async_trait::async_trait;
use std::sync::Arc;

/// Client for the remote chat API
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Ask a question; resolves to the answer text
    async fn ask(&self, request: &AskRequest) -> Result<String, ApiError>;

    /// Fetch the ordered tour script
    async fn fetch_tour(&self) -> Result<Vec<String>, ApiError>;

    /// Whether an endpoint is configured at all
    fn is_configured(&self) -> bool;
}

/// Durable storage for the conversation history.
///
/// Neither operation fails: a broken snapshot loads as empty and a failed
/// write is only logged.
pub trait HistoryPersistence: Send + Sync {
    fn load(&self) -> Vec<ConversationEntry>;

    fn save(&self, history: &[ConversationEntry]);
}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

#[async_trait]
impl<T: ChatClient + ?Sized> ChatClient for Arc<T> {
    async fn ask(&self, request: &AskRequest) -> Result<String, ApiError> {
        (**self).ask(request).await
    }

    async fn fetch_tour(&self) -> Result<Vec<String>, ApiError> {
        (**self).fetch_tour().await
    }

    fn is_configured(&self) -> bool {
        (**self).is_configured()
    }
}

impl<T: HistoryPersistence + ?Sized> HistoryPersistence for Arc<T> {
    fn load(&self) -> Vec<ConversationEntry> {
        (**self).load()
    }

    fn save(&self, history: &[ConversationEntry]) {
        (**self).save(history);
    }
}

// ============================================================================
// Production Adapters
// ============================================================================

/// Adapter storing the history as one JSON value under a single key
#[derive(Clone)]
pub struct DatabaseHistory {
    db: Database,
    key: String,
}

impl DatabaseHistory {
    pub fn new(db: Database, key: impl Into<String>) -> Self {
        Self {
            db,
            key: key.into(),
        }
    }

    /// Drop a snapshot that can't be read back so the next load starts clean
    fn purge(&self, reason: &str) {
        tracing::warn!(key = %self.key, reason, "Discarding unreadable conversation history");
        if let Err(e) = self.db.delete_value(&self.key) {
            tracing::warn!(key = %self.key, error = %e, "Failed to delete unreadable history");
        }
    }
}

impl HistoryPersistence for DatabaseHistory {
    fn load(&self) -> Vec<ConversationEntry> {
        let raw = match self.db.get_value(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "Failed to read conversation history");
                return Vec::new();
            }
        };

        let value: serde_json::Value = match serde_json::from_str(&raw) {
            Ok(v) => v,
            Err(e) => {
                self.purge(&format!("invalid JSON: {e}"));
                return Vec::new();
            }
        };

        if !value.is_array() {
            self.purge("not a sequence");
            return Vec::new();
        }

        match serde_json::from_value::<Vec<ConversationEntry>>(value) {
            Ok(entries) => {
                tracing::debug!(key = %self.key, count = entries.len(), "Loaded conversation history");
                entries
            }
            Err(e) => {
                self.purge(&format!("malformed entry: {e}"));
                Vec::new()
            }
        }
    }

    fn save(&self, history: &[ConversationEntry]) {
        let json = match serde_json::to_string(history) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "Failed to serialize conversation history");
                return;
            }
        };
        if let Err(e) = self.db.put_value(&self.key, &json) {
            tracing::warn!(key = %self.key, error = %e, "Failed to persist conversation history");
        }
    }
}
