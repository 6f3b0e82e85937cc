//! Events that can occur in a session

/// Events that trigger state transitions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    // User events; `request_id` names the remote call the command starts
    UserQuestion { text: String, request_id: String },
    TourRequested { request_id: String },
    ClearRequested,
    UserCancel,

    // Remote call outcomes, tagged with the request that produced them
    AnswerReceived { request_id: String, answer: String },
    AskFailed { request_id: String, message: String },
    TourLoaded { request_id: String, script: Vec<String> },
    TourFailed { request_id: String, message: String },

    // Tour playback
    TourStepElapsed { request_id: String, step: usize },
}
