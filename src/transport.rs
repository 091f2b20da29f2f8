//! HTTP delivery to the collector.
//!
//! [`NetworkClient`] sends the events of a batch one at a time, in order,
//! retrying rate limits and transient failures with exponential backoff.
//! When a batch cannot complete, the unsent remainder travels back to the
//! queue inside [`SendFailure`] so nothing is lost.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tracing::{debug, warn};

use crate::config::Config;
use crate::diagnostics::SharedDiagnostics;
use crate::event::Event;

/// Delivery errors, classified by collector response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkError {
    /// No API key configured; sending was attempted anyway
    NotConfigured,
    /// 401 from the collector; the API key is wrong
    Unauthorized,
    /// 400 from the collector; the event is malformed
    BadRequest,
    /// 429 from the collector and retries are exhausted
    RateLimited,
    /// Other non-2xx status and retries are exhausted
    ServerError(u16),
    /// Transport-level failure and retries are exhausted
    Network(String),
}

impl NetworkError {
    /// Whether the error is worth retrying with backoff.
    fn is_retryable(&self) -> bool {
        matches!(
            self,
            NetworkError::RateLimited | NetworkError::ServerError(_) | NetworkError::Network(_)
        )
    }
}

impl std::fmt::Display for NetworkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NetworkError::NotConfigured => write!(f, "SDK not configured with an API key"),
            NetworkError::Unauthorized => write!(f, "collector rejected the API key (401)"),
            NetworkError::BadRequest => write!(f, "collector rejected the event (400)"),
            NetworkError::RateLimited => write!(f, "rate limited (429), retries exhausted"),
            NetworkError::ServerError(code) => write!(f, "collector error ({code}), retries exhausted"),
            NetworkError::Network(e) => write!(f, "network error: {e}"),
        }
    }
}

impl std::error::Error for NetworkError {}

/// A failed batch delivery: the error plus everything not yet accepted by the
/// collector, in original order.
#[derive(Debug)]
pub struct SendFailure {
    pub error: NetworkError,
    pub unsent: Vec<Event>,
}

/// Anything able to deliver a batch of events to the collector.
pub trait Transport: Send + Sync {
    /// Deliver `batch` in order. On failure, returns the unsent remainder.
    fn send_batch<'a>(
        &'a self,
        batch: Vec<Event>,
    ) -> Pin<Box<dyn Future<Output = Result<(), SendFailure>> + Send + 'a>>;
}

/// Delivery client for the Respectlytics collector.
pub struct NetworkClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    max_retries: u32,
    retry_base_delay: Duration,
    diagnostics: SharedDiagnostics,
}

impl NetworkClient {
    /// Create a client from the SDK configuration.
    pub fn new(config: &Config, diagnostics: SharedDiagnostics) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .expect("failed to build HTTP client");

        Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            max_retries: config.max_retries,
            retry_base_delay: config.retry_base_delay,
            diagnostics,
        }
    }

    /// Send one event, retrying retryable failures with exponential backoff.
    async fn send_event(&self, event: &Event) -> Result<(), NetworkError> {
        let mut attempt = 1u32;

        loop {
            let error = match self.post_event(event).await {
                Ok(()) => return Ok(()),
                Err(e) if e.is_retryable() => e,
                Err(e) => return Err(e),
            };

            if attempt >= self.max_retries {
                return Err(error);
            }

            let delay = self.backoff_delay(attempt);
            debug!(
                event = %event.event_name,
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "delivery attempt failed, backing off"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    /// One POST to the collector, classified by status code.
    async fn post_event(&self, event: &Event) -> Result<(), NetworkError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .header("X-App-Key", &self.api_key)
            .json(event)
            .send()
            .await
            .map_err(|e| NetworkError::Network(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        match status.as_u16() {
            401 => Err(NetworkError::Unauthorized),
            400 => Err(NetworkError::BadRequest),
            429 => Err(NetworkError::RateLimited),
            code => Err(NetworkError::ServerError(code)),
        }
    }

    /// Backoff before retry `attempt`: base delay doubled per attempt.
    fn backoff_delay(&self, attempt: u32) -> Duration {
        self.retry_base_delay * 2u32.saturating_pow(attempt)
    }
}

impl Transport for NetworkClient {
    fn send_batch<'a>(
        &'a self,
        batch: Vec<Event>,
    ) -> Pin<Box<dyn Future<Output = Result<(), SendFailure>> + Send + 'a>> {
        Box::pin(async move {
            if self.api_key.is_empty() {
                return Err(SendFailure {
                    error: NetworkError::NotConfigured,
                    unsent: batch,
                });
            }

            let mut remaining = std::collections::VecDeque::from(batch);

            while let Some(event) = remaining.front() {
                match self.send_event(event).await {
                    Ok(()) => {
                        self.diagnostics.record_sent();
                        remaining.pop_front();
                    }
                    Err(NetworkError::BadRequest) => {
                        // A malformed event will never become well-formed;
                        // drop it instead of blocking the rest of the batch.
                        warn!(event = %event.event_name, "collector rejected event as malformed, dropping it");
                        self.diagnostics.record_dropped();
                        remaining.pop_front();
                    }
                    Err(error) => {
                        return Err(SendFailure {
                            error,
                            unsent: remaining.into(),
                        });
                    }
                }
            }

            Ok(())
        })
    }
}
