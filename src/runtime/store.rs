//! In-memory conversation history with write-through persistence

use super::traits::HistoryPersistence;
use super::SessionUpdate;
use crate::db::ConversationEntry;
use tokio::sync::broadcast;

/// Ordered conversation history owned by the session runtime.
///
/// Every mutation is saved before it is published, so observers never see
/// an entry that isn't durable yet.
pub struct MessageStore<P: HistoryPersistence> {
    entries: Vec<ConversationEntry>,
    persistence: P,
    notifier: broadcast::Sender<SessionUpdate>,
}

impl<P: HistoryPersistence> MessageStore<P> {
    /// Build the store from whatever the persistence layer holds
    pub fn hydrate(persistence: P, notifier: broadcast::Sender<SessionUpdate>) -> Self {
        let entries = persistence.load();
        Self {
            entries,
            persistence,
            notifier,
        }
    }

    pub fn append(&mut self, entry: ConversationEntry) {
        self.entries.push(entry.clone());
        self.persistence.save(&self.entries);
        let _ = self.notifier.send(SessionUpdate::EntryAppended { entry });
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.persistence.save(&self.entries);
        let _ = self.notifier.send(SessionUpdate::Cleared);
    }

    pub fn snapshot(&self) -> &[ConversationEntry] {
        &self.entries
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionUpdate> {
        self.notifier.subscribe()
    }
}
