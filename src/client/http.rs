//! reqwest-backed chat API client

use super::types::{AskRequest, AskResponse, ErrorBody, TourResponse};
use super::ApiError;
use crate::config::Endpoints;
use crate::runtime::ChatClient;
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use std::time::Duration;

/// HTTP implementation of the two remote operations.
///
/// Built without endpoints when no base URL is configured; every call then
/// fails with [`ApiError::not_configured`] before any network I/O.
pub struct HttpChatClient {
    client: Client,
    endpoints: Option<Endpoints>,
}

impl HttpChatClient {
    pub fn new(endpoints: Option<Endpoints>, timeout: Option<Duration>) -> Result<Self, ApiError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| ApiError::network(format!("failed to create HTTP client: {e}")))?;

        Ok(Self { client, endpoints })
    }

    fn endpoints(&self) -> Result<&Endpoints, ApiError> {
        self.endpoints.as_ref().ok_or_else(ApiError::not_configured)
    }

    fn transport_error(e: &reqwest::Error) -> ApiError {
        if e.is_timeout() {
            ApiError::timeout(e)
        } else {
            ApiError::network(e)
        }
    }

    fn classify_error(status: StatusCode, body: &str) -> ApiError {
        let detail = serde_json::from_str::<ErrorBody>(body)
            .ok()
            .map(|b| b.error)
            .filter(|e| !e.trim().is_empty())
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("Unknown Status")
                    .to_string()
            });
        ApiError::protocol(status.as_u16(), detail)
    }

    /// Read the body of a settled response, mapping non-2xx to a protocol error
    async fn success_body(response: Response) -> Result<String, ApiError> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Self::transport_error(&e))?;

        if !status.is_success() {
            return Err(Self::classify_error(status, &body));
        }
        Ok(body)
    }
}

#[async_trait]
impl ChatClient for HttpChatClient {
    async fn ask(&self, request: &AskRequest) -> Result<String, ApiError> {
        let endpoints = self.endpoints()?;

        let response = self
            .client
            .post(&endpoints.ask)
            .json(request)
            .send()
            .await
            .map_err(|e| Self::transport_error(&e))?;

        let body = Self::success_body(response).await?;
        let parsed: AskResponse = serde_json::from_str(&body).map_err(ApiError::payload)?;
        Ok(parsed.answer)
    }

    async fn fetch_tour(&self) -> Result<Vec<String>, ApiError> {
        let endpoints = self.endpoints()?;

        let response = self
            .client
            .get(&endpoints.tour)
            .send()
            .await
            .map_err(|e| Self::transport_error(&e))?;

        let body = Self::success_body(response).await?;
        let parsed: TourResponse = serde_json::from_str(&body).map_err(ApiError::payload)?;
        Ok(parsed.tour)
    }

    fn is_configured(&self) -> bool {
        self.endpoints.is_some()
    }
}
