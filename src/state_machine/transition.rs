//! Pure state transition function
//!
//! Given the same state, context and event this always produces the same
//! result and performs no I/O. The runtime executes the returned effects.

use super::{Effect, Event, SessionContext, SessionMode, SessionState};
use crate::client::ApiError;
use std::collections::VecDeque;
use thiserror::Error;

/// Text of the follow-up entry appended when the user cancels a question
pub const CANCELLED_MESSAGE: &str = "Request cancelled.";

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: SessionState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: SessionState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_effects(mut self, effects: impl IntoIterator<Item = Effect>) -> Self {
        self.effects.extend(effects);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Session is busy ({mode:?}); wait for it to finish or cancel it first")]
    SessionBusy { mode: SessionMode },
    #[error("Question is empty")]
    EmptyQuestion,
    #[error("Nothing to cancel")]
    NothingToCancel,
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

impl TransitionError {
    /// Rejections of user commands, as opposed to stale internal events
    pub fn is_user_facing(&self) -> bool {
        !matches!(self, TransitionError::InvalidTransition(_))
    }
}

/// Pure transition function
#[allow(clippy::too_many_lines)] // One arm per (state, event) pair
pub fn transition(
    state: &SessionState,
    context: &SessionContext,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    match (state, event) {
        // ============================================================
        // Asking a question
        // ============================================================

        (SessionState::Idle, Event::UserQuestion { text, request_id }) => {
            let question = text.trim();
            if question.is_empty() {
                return Err(TransitionError::EmptyQuestion);
            }

            if !context.api_configured {
                return Ok(TransitionResult::new(SessionState::Idle)
                    .with_effect(Effect::append_user(question))
                    .with_effect(Effect::append_error(ApiError::not_configured().message)));
            }

            Ok(TransitionResult::new(SessionState::Answering {
                request_id: request_id.clone(),
            })
            .with_effect(Effect::append_user(question))
            .with_effect(Effect::SetTyping(true))
            .with_effect(Effect::RequestAnswer {
                request_id,
                question: question.to_string(),
            }))
        }

        (
            SessionState::Answering { request_id },
            Event::AnswerReceived {
                request_id: answered,
                answer,
            },
        ) if answered == *request_id => Ok(TransitionResult::new(SessionState::Idle)
            .with_effect(Effect::SetTyping(false))
            .with_effect(Effect::append_bot(answer))),

        (
            SessionState::Answering { request_id },
            Event::AskFailed {
                request_id: failed,
                message,
            },
        ) if failed == *request_id => Ok(TransitionResult::new(SessionState::Idle)
            .with_effect(Effect::SetTyping(false))
            .with_effect(Effect::append_error(message))),

        (SessionState::Answering { .. }, Event::UserCancel) => {
            Ok(TransitionResult::new(SessionState::Idle)
                .with_effect(Effect::AbortRequest)
                .with_effect(Effect::SetTyping(false))
                .with_effect(Effect::append_error(CANCELLED_MESSAGE)))
        }

        // ============================================================
        // Guided tour
        // ============================================================

        (SessionState::Idle, Event::TourRequested { request_id }) => {
            if !context.api_configured {
                return Ok(TransitionResult::new(SessionState::Idle)
                    .with_effect(Effect::ClearHistory)
                    .with_effect(Effect::append_error(ApiError::not_configured().message)));
            }

            Ok(TransitionResult::new(SessionState::FetchingTour {
                request_id: request_id.clone(),
            })
            .with_effect(Effect::ClearHistory)
            .with_effect(Effect::SetTyping(true))
            .with_effect(Effect::RequestTour { request_id }))
        }

        (
            SessionState::FetchingTour { request_id },
            Event::TourLoaded {
                request_id: loaded,
                script,
            },
        ) if loaded == *request_id => {
            if script.is_empty() {
                return Ok(TransitionResult::new(SessionState::Idle)
                    .with_effect(Effect::SetTyping(false)));
            }
            Ok(play_next(loaded, script.into(), 0))
        }

        (
            SessionState::FetchingTour { request_id },
            Event::TourFailed {
                request_id: failed,
                message,
            },
        ) if failed == *request_id => Ok(TransitionResult::new(SessionState::Idle)
            .with_effect(Effect::SetTyping(false))
            .with_effect(Effect::append_error(message))),

        (SessionState::FetchingTour { .. }, Event::UserCancel) => {
            Ok(TransitionResult::new(SessionState::Idle)
                .with_effect(Effect::AbortRequest)
                .with_effect(Effect::SetTyping(false)))
        }

        // The current message has "arrived": hide typing, then move on
        (
            SessionState::PlayingTour {
                request_id,
                remaining,
                step,
            },
            Event::TourStepElapsed {
                request_id: tour,
                step: elapsed,
            },
        ) if tour == *request_id && elapsed == *step => {
            let next = play_next(tour, remaining.clone(), step + 1);
            Ok(TransitionResult::new(next.new_state)
                .with_effect(Effect::SetTyping(false))
                .with_effects(next.effects))
        }

        (SessionState::PlayingTour { .. }, Event::UserCancel) => {
            Ok(TransitionResult::new(SessionState::Idle)
                .with_effect(Effect::AbortTourStep)
                .with_effect(Effect::SetTyping(false)))
        }

        // ============================================================
        // Reset
        // ============================================================

        (SessionState::Idle, Event::ClearRequested) => {
            Ok(TransitionResult::new(SessionState::Idle).with_effect(Effect::ClearHistory))
        }

        // ============================================================
        // Rejections
        // ============================================================

        (
            SessionState::Answering { .. }
            | SessionState::FetchingTour { .. }
            | SessionState::PlayingTour { .. },
            Event::UserQuestion { .. } | Event::TourRequested { .. } | Event::ClearRequested,
        ) => Err(TransitionError::SessionBusy { mode: state.mode() }),

        (SessionState::Idle, Event::UserCancel) => Err(TransitionError::NothingToCancel),

        (state, event) => Err(TransitionError::InvalidTransition(format!(
            "No transition from {state:?} with event {event:?}"
        ))),
    }
}

/// Append the next script message and start its typing delay, or finish
fn play_next(request_id: String, mut remaining: VecDeque<String>, step: usize) -> TransitionResult {
    match remaining.pop_front() {
        Some(text) => TransitionResult::new(SessionState::PlayingTour {
            request_id: request_id.clone(),
            remaining,
            step,
        })
        .with_effect(Effect::append_bot(text.clone()))
        .with_effect(Effect::SetTyping(true))
        .with_effect(Effect::ScheduleTourStep {
            request_id,
            text,
            step,
        }),
        None => TransitionResult::new(SessionState::Idle),
    }
}
