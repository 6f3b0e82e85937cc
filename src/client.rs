//! Remote chat API client
//!
//! Two operations: ask a question (`POST /api/ask`) and fetch the guided tour
//! script (`GET /api/tour`).

mod error;
mod http;
mod types;

pub use error::{ApiError, ApiErrorKind};
pub use http::HttpChatClient;
pub use types::AskRequest;

use crate::runtime::ChatClient;
use async_trait::async_trait;
use std::time::Instant;

/// Logging wrapper for chat clients
pub struct LoggingClient<C> {
    inner: C,
}

impl<C: ChatClient> LoggingClient<C> {
    pub fn new(inner: C) -> Self {
        Self { inner }
    }
}

fn log_outcome<T>(operation: &str, started: Instant, result: &Result<T, ApiError>) {
    let duration = started.elapsed();
    match result {
        Ok(_) => {
            tracing::info!(
                operation,
                duration_ms = %duration.as_millis(),
                "Chat API request completed"
            );
        }
        Err(e) => {
            tracing::warn!(
                operation,
                duration_ms = %duration.as_millis(),
                kind = ?e.kind,
                transport = e.kind.is_transport(),
                error = %e.message,
                "Chat API request failed"
            );
        }
    }
}

#[async_trait]
impl<C: ChatClient> ChatClient for LoggingClient<C> {
    async fn ask(&self, request: &AskRequest) -> Result<String, ApiError> {
        let started = Instant::now();
        let result = self.inner.ask(request).await;
        log_outcome("ask", started, &result);
        result
    }

    async fn fetch_tour(&self) -> Result<Vec<String>, ApiError> {
        let started = Instant::now();
        let result = self.inner.fetch_tour().await;
        if let Ok(script) = &result {
            tracing::debug!(steps = script.len(), "Tour script received");
        }
        log_outcome("tour", started, &result);
        result
    }

    fn is_configured(&self) -> bool {
        self.inner.is_configured()
    }
}
