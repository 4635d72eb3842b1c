//! HTTP client for the review API with retry and backoff.

use std::time::{Duration, Instant};

use backoff::{future::retry_notify, ExponentialBackoff};
use reqwest::{Client, Method, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use crate::api::{CommitRequest, CommitResponse, ErrorBody, MatchTask, SkipRequest};

/// Failure talking to the review API.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Server answered with a non-2xx status.
    #[error("server returned {status}: {message} ({code})")]
    Api {
        status: StatusCode,
        code: String,
        message: String,
    },

    /// Server could not be reached.
    #[error("server unreachable: {0}")]
    Unreachable(String),

    /// Response body did not match the expected shape.
    #[error("unexpected response: {0}")]
    Decode(String),
}

impl ClientError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Retry settings for [`ApiClient`].
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Per-request timeout.
    pub timeout: Duration,
    pub initial_interval: Duration,
    pub max_interval: Duration,
    /// Give up retrying after this long; zero disables retries.
    pub max_elapsed: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            initial_interval: Duration::from_millis(200),
            max_interval: Duration::from_secs(2),
            max_elapsed: Duration::from_secs(10),
        }
    }
}

pub struct ApiClient {
    client: Client,
    base_url: String,
    retry: RetryConfig,
}

impl ApiClient {
    pub fn new(base_url: &str, retry: RetryConfig) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(retry.timeout)
            .build()
            .map_err(|e| ClientError::Unreachable(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            retry,
        })
    }

    pub async fn next_task(&self, offset: u64) -> Result<MatchTask, ClientError> {
        self.request::<(), _>(Method::GET, &format!("/api/match/{offset}"), None)
            .await
    }

    /// Record a decision. Commits are idempotent server-side, so retries are safe.
    pub async fn commit(
        &self,
        item_id: i64,
        reference_id: Option<i64>,
        rematch: bool,
        offset: u64,
    ) -> Result<CommitResponse, ClientError> {
        let body = CommitRequest {
            item_id,
            reference_id,
            rematch,
            offset,
        };
        self.request(Method::POST, "/api/match/commit", Some(&body))
            .await
    }

    pub async fn skip(&self, item_id: i64) -> Result<CommitResponse, ClientError> {
        self.request(Method::POST, "/api/match/skip", Some(&SkipRequest { item_id }))
            .await
    }

    async fn request<B, R>(&self, method: Method, path: &str, body: Option<&B>) -> Result<R, ClientError>
    where
        B: Serialize,
        R: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);

        retry_notify(
            self.build_backoff(),
            || {
                let (method, url) = (method.clone(), url.as_str());
                async move { self.send_once(method, url, body).await }
            },
            |err: ClientError, duration: Duration| {
                warn!(
                    error = %err,
                    retry_after_ms = duration.as_millis() as u64,
                    "Retry scheduled"
                );
            },
        )
        .await
    }

    async fn send_once<B, R>(
        &self,
        method: Method,
        url: &str,
        body: Option<&B>,
    ) -> Result<R, backoff::Error<ClientError>>
    where
        B: Serialize,
        R: DeserializeOwned,
    {
        let start = Instant::now();

        let mut request = self.client.request(method, url);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| {
            let err = ClientError::Unreachable(e.to_string());
            if is_transient_error(&e) {
                backoff::Error::transient(err)
            } else {
                backoff::Error::permanent(err)
            }
        })?;

        let status = response.status();
        debug!(
            %status,
            url,
            latency_ms = start.elapsed().as_millis() as u64,
            "Received HTTP response"
        );

        if !status.is_success() {
            let (code, message) = match response.json::<ErrorBody>().await {
                Ok(body) => (body.code, body.error),
                Err(_) => ("UNKNOWN".to_string(), status.to_string()),
            };
            let err = ClientError::Api {
                status,
                code,
                message,
            };
            return Err(if is_transient_status(status) {
                backoff::Error::transient(err)
            } else {
                backoff::Error::permanent(err)
            });
        }

        response
            .json()
            .await
            .map_err(|e| backoff::Error::permanent(ClientError::Decode(e.to_string())))
    }

    fn build_backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            initial_interval: self.retry.initial_interval,
            max_interval: self.retry.max_interval,
            max_elapsed_time: Some(self.retry.max_elapsed),
            ..Default::default()
        }
    }
}

/// Check if a reqwest error is transient and should be retried.
fn is_transient_error(error: &reqwest::Error) -> bool {
    error.is_timeout() || error.is_connect()
}

/// Check if an HTTP status code indicates a transient error.
///
/// 409 is not retried: a conflicting transition will not resolve itself.
fn is_transient_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
            | StatusCode::BAD_GATEWAY
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_status_codes() {
        assert!(is_transient_status(StatusCode::SERVICE_UNAVAILABLE));
        assert!(is_transient_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(!is_transient_status(StatusCode::CONFLICT));
        assert!(!is_transient_status(StatusCode::NOT_FOUND));
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let client = ApiClient::new("http://localhost:5000/", RetryConfig::default()).unwrap();
        assert_eq!(client.base_url, "http://localhost:5000");
    }

    #[test]
    fn test_status_accessor() {
        let err = ClientError::Api {
            status: StatusCode::CONFLICT,
            code: "CONFLICTING_TRANSITION".into(),
            message: "conflict".into(),
        };
        assert_eq!(err.status(), Some(StatusCode::CONFLICT));
        assert_eq!(ClientError::Decode("x".into()).status(), None);
    }
}
