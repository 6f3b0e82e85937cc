//! Session state types

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Session state
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionState {
    /// Ready for user input, nothing in flight
    #[default]
    Idle,

    /// Question sent, waiting for the answer
    Answering { request_id: String },

    /// Tour script requested, waiting for it to arrive
    FetchingTour { request_id: String },

    /// Playing back a tour script one message at a time
    PlayingTour {
        /// Request the script came from; tags every step timer
        request_id: String,
        /// Messages not yet appended, in script order
        remaining: VecDeque<String>,
        /// Index of the message whose typing delay is pending
        step: usize,
    },
}

impl SessionState {
    /// Public projection onto the three mutually exclusive modes
    pub fn mode(&self) -> SessionMode {
        match self {
            SessionState::Idle => SessionMode::Idle,
            SessionState::Answering { .. } => SessionMode::Answering,
            SessionState::FetchingTour { .. } | SessionState::PlayingTour { .. } => {
                SessionMode::Touring
            }
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, SessionState::Idle)
    }
}

/// Mutually exclusive activity of the session
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionMode {
    Idle,
    Answering,
    Touring,
}

/// Context for a session (immutable configuration)
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub session_id: String,
    /// Whether the remote API has an endpoint; when false every remote
    /// operation fails fast with a configuration error entry
    pub api_configured: bool,
}

impl SessionContext {
    pub fn new(session_id: impl Into<String>, api_configured: bool) -> Self {
        Self {
            session_id: session_id.into(),
            api_configured,
        }
    }
}
