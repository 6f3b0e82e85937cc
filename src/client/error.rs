//! Chat API error types

use thiserror::Error;

/// Chat API error with classification.
///
/// `message` is the exact text shown to the user as an `error` entry.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct ApiError {
    pub kind: ApiErrorKind,
    pub message: String,
}

impl ApiError {
    pub fn new(kind: ApiErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn not_configured() -> Self {
        Self::new(
            ApiErrorKind::NotConfigured,
            "Configuration Error: the chat API endpoint is not configured.",
        )
    }

    pub fn network(message: impl std::fmt::Display) -> Self {
        Self::new(ApiErrorKind::Network, format!("Network Error: {message}"))
    }

    pub fn timeout(message: impl std::fmt::Display) -> Self {
        Self::new(
            ApiErrorKind::Timeout,
            format!("Network Error: request timed out ({message})"),
        )
    }

    /// Non-2xx response; `detail` is the server's `error` field or the status text
    pub fn protocol(status: u16, detail: impl std::fmt::Display) -> Self {
        Self::new(
            ApiErrorKind::Protocol { status },
            format!("API Error: {status} - {detail}"),
        )
    }

    /// 2xx response whose body is not the expected shape
    pub fn payload(detail: impl std::fmt::Display) -> Self {
        Self::new(
            ApiErrorKind::Payload,
            format!("API Error: unexpected response format ({detail})"),
        )
    }
}

/// Error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    /// No endpoint configured; the call was never attempted
    NotConfigured,
    /// Request could not complete (DNS, connect, reset)
    Network,
    /// Request exceeded the configured timeout
    Timeout,
    /// Server answered with a non-2xx status
    Protocol { status: u16 },
    /// Server answered 2xx with a malformed body
    Payload,
}

impl ApiErrorKind {
    pub fn is_transport(self) -> bool {
        matches!(self, Self::Network | Self::Timeout)
    }
}
