//! SDK configuration.

use std::path::PathBuf;
use std::time::Duration;

use crate::event::EventMetadata;
use crate::session::SESSION_ROTATION_WINDOW;

/// Default collector endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://respectlytics.com/api/v1/events/";

/// Queue size at which an automatic flush triggers.
pub const DEFAULT_MAX_QUEUE_SIZE: usize = 10;

/// Interval between periodic flushes.
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(30);

/// Delivery attempts per event before giving up.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Per-request HTTP timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for a Respectlytics client.
#[derive(Debug, Clone)]
pub struct Config {
    /// API key from the dashboard, sent as the `X-App-Key` header
    pub api_key: String,
    /// Collector endpoint receiving event POSTs
    pub endpoint: String,
    /// Queue size threshold for automatic flushes
    pub max_queue_size: usize,
    /// Periodic flush interval
    pub flush_interval: Duration,
    /// Delivery attempts per event before the batch is failed
    pub max_retries: u32,
    /// Base unit of the exponential backoff (delay = base * 2^attempt)
    pub retry_base_delay: Duration,
    /// Per-request HTTP timeout
    pub request_timeout: Duration,
    /// Session id rotation window
    pub session_rotation_window: Duration,
    /// Durable-store directory; `None` uses the platform data directory
    pub data_path: Option<PathBuf>,
    /// Device/app metadata stamped onto every event
    pub metadata: EventMetadata,
}

impl Config {
    /// Create a configuration with defaults for everything but the API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            max_queue_size: DEFAULT_MAX_QUEUE_SIZE,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_base_delay: Duration::from_secs(1),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            session_rotation_window: SESSION_ROTATION_WINDOW,
            data_path: None,
            metadata: EventMetadata::detect("unknown"),
        }
    }

    /// Override the collector endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Set the host application version reported with every event.
    pub fn with_app_version(mut self, app_version: impl Into<String>) -> Self {
        self.metadata.app_version = app_version.into();
        self
    }

    /// Override the durable-store directory.
    pub fn with_data_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_path = Some(path.into());
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_key.is_empty() {
            return Err(ConfigError::MissingApiKey);
        }
        if self.max_queue_size == 0 {
            return Err(ConfigError::InvalidQueueSize);
        }
        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    MissingApiKey,
    InvalidQueueSize,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::MissingApiKey => write!(f, "API key cannot be empty"),
            ConfigError::InvalidQueueSize => write!(f, "max queue size must be at least 1"),
        }
    }
}

impl std::error::Error for ConfigError {}
