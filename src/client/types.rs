//! Wire types for the chat API

use crate::db::ConversationEntry;
use serde::{Deserialize, Serialize};

/// Body of `POST /api/ask`
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AskRequest {
    pub question: String,
    pub history: Vec<ConversationEntry>,
}

/// Successful `/api/ask` body
#[derive(Debug, Deserialize)]
pub(super) struct AskResponse {
    pub answer: String,
}

/// Successful `/api/tour` body
#[derive(Debug, Deserialize)]
pub(super) struct TourResponse {
    pub tour: Vec<String>,
}

/// Error body returned with non-2xx statuses
#[derive(Debug, Deserialize)]
pub(super) struct ErrorBody {
    pub error: String,
}
