//! Bounded-time HTTP exchange with the feedback backend.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use shared::{
    domain::{SubmissionPayload, SubmissionResult, WidgetConfig},
    error::ApiError,
    protocol::{feedback_url, health_url, ErrorBody, API_KEY_HEADER},
};
use tracing::{debug, info, warn};

#[async_trait]
pub trait FeedbackTransport: Send + Sync {
    /// Delivers one submission. Every failure is classified into an [`ApiError`].
    async fn submit(&self, payload: &SubmissionPayload) -> Result<SubmissionResult, ApiError>;

    /// Liveness probe. Never fails; any problem is reported as `false`.
    async fn health_check(&self) -> bool;
}

pub struct HttpFeedbackClient {
    http: Client,
    api_url: String,
    api_key: String,
    timeout: Duration,
}

impl HttpFeedbackClient {
    pub fn new(api_url: impl Into<String>, api_key: impl Into<String>, timeout: Duration) -> Self {
        let api_url = api_url.into();
        let api_url = api_url.strip_suffix('/').unwrap_or(&api_url).to_string();
        Self {
            http: Client::new(),
            api_url,
            api_key: api_key.into(),
            timeout,
        }
    }

    pub fn from_config(config: &WidgetConfig) -> Self {
        Self::new(&config.api_url, &config.api_key, config.timeout)
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn exchange(&self, payload: &SubmissionPayload) -> Result<SubmissionResult, ApiError> {
        let response = self
            .http
            .post(feedback_url(&self.api_url))
            .header(API_KEY_HEADER, &self.api_key)
            .json(payload)
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.json::<ErrorBody>().await.unwrap_or_default();
            let message = body
                .message
                .filter(|message| !message.trim().is_empty())
                .unwrap_or_else(|| status_line(status));
            return Err(ApiError::rejected(status.as_u16(), message));
        }

        response
            .json::<SubmissionResult>()
            .await
            .map_err(classify_transport_error)
    }
}

#[async_trait]
impl FeedbackTransport for HttpFeedbackClient {
    async fn submit(&self, payload: &SubmissionPayload) -> Result<SubmissionResult, ApiError> {
        debug!(
            project_id = %payload.project_id,
            rating = payload.rating,
            timeout_ms = self.timeout.as_millis() as u64,
            "submitting feedback"
        );

        // The deadline future is dropped with the exchange on every path.
        let outcome = match tokio::time::timeout(self.timeout, self.exchange(payload)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(ApiError::Timeout),
        };

        match &outcome {
            Ok(result) => info!(
                project_id = %payload.project_id,
                feedback_id = result.feedback_id.as_deref().unwrap_or("-"),
                "feedback accepted"
            ),
            Err(error) => warn!(
                project_id = %payload.project_id,
                code = error.code(),
                %error,
                "feedback submission failed"
            ),
        }
        outcome
    }

    async fn health_check(&self) -> bool {
        let probe = self
            .http
            .get(health_url(&self.api_url))
            .header(API_KEY_HEADER, &self.api_key)
            .send();

        match tokio::time::timeout(self.timeout, probe).await {
            Ok(Ok(response)) => {
                let healthy = response.status().is_success();
                debug!(status = response.status().as_u16(), healthy, "health check");
                healthy
            }
            Ok(Err(error)) => {
                debug!(%error, "health check failed");
                false
            }
            Err(_) => {
                debug!("health check timed out");
                false
            }
        }
    }
}

fn classify_transport_error(error: reqwest::Error) -> ApiError {
    if error.is_timeout() {
        ApiError::Timeout
    } else {
        ApiError::transport(error.to_string())
    }
}

fn status_line(status: StatusCode) -> String {
    format!(
        "HTTP {}: {}",
        status.as_u16(),
        status.canonical_reason().unwrap_or_default()
    )
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod tests;
