//! Adapter interfaces for language model backends.
//!
//! Adapters turn a chat request into a parsed JSON value. The coding
//! orchestrator only depends on the `LlmAdapter` trait, so tests can script
//! responses without a network.

pub mod openai;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, warn};

// Re-export the OpenAI-compatible adapter
pub use openai::{OpenAiAdapter, OpenAiSettings};

/// Chat message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// A single chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

/// A request for a JSON-object completion
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,

    /// Per-request timeout
    pub timeout: Duration,
}

/// Errors from a model backend
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("Missing required environment variable: {0}")]
    NotConfigured(String),

    #[error("Request failed: {0}")]
    Http(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("API returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid JSON response: {0}")]
    InvalidResponse(String),
}

impl AdapterError {
    /// Whether another attempt may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::NotConfigured(_) => false,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::Http(_) | Self::Timeout(_) | Self::InvalidResponse(_) => true,
        }
    }
}

/// Trait for language model backends
#[async_trait]
pub trait LlmAdapter: Send + Sync {
    /// Human-readable adapter name
    fn name(&self) -> &str;

    /// Run a chat completion and parse the reply as JSON
    async fn complete_json(&self, request: &ChatRequest) -> Result<serde_json::Value, AdapterError>;
}

/// Retry policy for failed model calls
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including first try)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial delay between retries in milliseconds
    #[serde(default = "default_initial_delay")]
    pub initial_delay_ms: u64,

    /// Maximum delay between retries in milliseconds
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,

    /// Backoff multiplier (delay *= multiplier after each retry)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
}

fn default_max_attempts() -> u32 {
    3
}
fn default_initial_delay() -> u64 {
    1000
}
fn default_max_delay() -> u64 {
    30000
}
fn default_backoff_multiplier() -> f64 {
    2.0
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay(),
            max_delay_ms: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }

    /// Calculate delay for a specific attempt (1-indexed)
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::from_millis(self.initial_delay_ms);
        }

        let delay = self.initial_delay_ms as f64 * self.backoff_multiplier.powi((attempt - 1) as i32);

        let capped = delay.min(self.max_delay_ms as f64) as u64;
        Duration::from_millis(capped)
    }

    /// Check if we should retry based on attempt count
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}

/// Call the adapter, retrying retryable failures with backoff
pub async fn complete_with_retry(
    adapter: &dyn LlmAdapter,
    request: &ChatRequest,
    policy: &RetryPolicy,
) -> Result<serde_json::Value, AdapterError> {
    let mut attempt = 0u32;

    loop {
        attempt += 1;

        match adapter.complete_json(request).await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && policy.should_retry(attempt) => {
                let delay = policy.delay_for_attempt(attempt);
                warn!(
                    adapter = adapter.name(),
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Model call failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                error!(adapter = adapter.name(), attempt, error = %e, "Model call failed permanently");
                return Err(e);
            }
        }
    }
}
