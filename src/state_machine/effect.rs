//! Effects produced by state transitions

use crate::db::ConversationEntry;

/// Effects to be executed after state transition, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Append one entry to the history (persisted immediately)
    AppendEntry(ConversationEntry),

    /// Replace the history with an empty sequence (persisted immediately)
    ClearHistory,

    /// Set or clear the typing signal
    SetTyping(bool),

    /// Send the question along with the current history snapshot
    RequestAnswer { request_id: String, question: String },

    /// Fetch the tour script
    RequestTour { request_id: String },

    /// Wait out the typing delay for a tour message, then report the step
    ScheduleTourStep {
        request_id: String,
        text: String,
        step: usize,
    },

    /// Abort the in-flight remote call
    AbortRequest,

    /// Abort the pending tour step timer
    AbortTourStep,
}

impl Effect {
    pub fn append_user(text: impl Into<String>) -> Self {
        Effect::AppendEntry(ConversationEntry::user(text))
    }

    pub fn append_bot(text: impl Into<String>) -> Self {
        Effect::AppendEntry(ConversationEntry::bot(text))
    }

    pub fn append_error(text: impl Into<String>) -> Self {
        Effect::AppendEntry(ConversationEntry::error(text))
    }
}
