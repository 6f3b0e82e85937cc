//! Runtime for executing a chat session
//!
//! One task owns the history, the state and the typing signal. Commands go in
//! through a [`SessionHandle`]; everything observable comes out as
//! [`SessionUpdate`]s on a broadcast channel.

mod executor;
mod store;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use executor::SessionRuntime;
pub use traits::*;

use crate::db::ConversationEntry;
use crate::state_machine::{Event, SessionContext, SessionMode};
use crate::typing::TypingSimulator;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc};

/// Events sent to session observers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionUpdate {
    /// Sent once when the runtime starts, with the hydrated history
    Init {
        entries: Vec<ConversationEntry>,
        mode: SessionMode,
    },
    EntryAppended {
        entry: ConversationEntry,
    },
    Cleared,
    Typing {
        active: bool,
    },
    ModeChanged {
        mode: SessionMode,
    },
    /// A command was refused (busy, empty question, nothing to cancel)
    Rejected {
        reason: String,
    },
}

#[derive(Debug, Error)]
#[error("Session runtime has stopped")]
pub struct SessionClosed;

/// Handle to interact with a running session
#[derive(Clone)]
pub struct SessionHandle {
    event_tx: mpsc::Sender<Event>,
}

impl SessionHandle {
    pub async fn ask(&self, question: impl Into<String>) -> Result<(), SessionClosed> {
        self.send(Event::UserQuestion {
            text: question.into(),
            request_id: new_request_id(),
        })
        .await
    }

    pub async fn start_tour(&self) -> Result<(), SessionClosed> {
        self.send(Event::TourRequested {
            request_id: new_request_id(),
        })
        .await
    }

    pub async fn clear(&self) -> Result<(), SessionClosed> {
        self.send(Event::ClearRequested).await
    }

    pub async fn cancel(&self) -> Result<(), SessionClosed> {
        self.send(Event::UserCancel).await
    }

    async fn send(&self, event: Event) -> Result<(), SessionClosed> {
        self.event_tx.send(event).await.map_err(|_| SessionClosed)
    }
}

/// Id tagging one ask or tour; its completions must carry it back
fn new_request_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Hydrate a session and start its runtime task.
///
/// The returned receiver is subscribed before the task starts, so it always
/// observes `Init` first. The runtime stops once every handle is dropped,
/// which closes the receiver.
pub fn spawn_session<P, C>(
    session_id: impl Into<String>,
    persistence: P,
    client: C,
    simulator: TypingSimulator,
) -> (SessionHandle, broadcast::Receiver<SessionUpdate>)
where
    P: HistoryPersistence + 'static,
    C: ChatClient + 'static,
{
    let context = SessionContext::new(session_id, client.is_configured());
    let (event_tx, event_rx) = mpsc::channel(32);
    let (broadcast_tx, _) = broadcast::channel(256);

    let runtime = SessionRuntime::new(
        context,
        persistence,
        client,
        simulator,
        event_rx,
        event_tx.downgrade(),
        broadcast_tx,
    );
    let updates = runtime.subscribe();

    tokio::spawn(async move {
        runtime.run().await;
    });

    (SessionHandle { event_tx }, updates)
}
