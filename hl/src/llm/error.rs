//! LLM error types

use std::time::Duration;
use thiserror::Error;

use crate::config::SUPPORTED_PROVIDERS;

/// Failures talking to a model provider
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("{provider} rate limited the request (retry after {}s)", retry_after.as_secs())]
    RateLimited { provider: String, retry_after: Duration },

    #[error("{provider} returned HTTP {status}: {message}")]
    Api {
        provider: String,
        status: u16,
        message: String,
    },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Unexpected response: {0}")]
    InvalidResponse(String),

    #[error("Unknown LLM provider '{0}' (supported: {supported})", supported = SUPPORTED_PROVIDERS.join(", "))]
    UnknownProvider(String),

    #[error("Missing API key: set the {env} environment variable")]
    MissingApiKey { env: String },

    #[error("Malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl LlmError {
    /// Transient failures: quota, 5xx, timeouts and transport errors
    pub fn is_retryable(&self) -> bool {
        match self {
            LlmError::RateLimited { .. } | LlmError::Network(_) | LlmError::Timeout(_) => true,
            LlmError::Api { status, .. } => *status == 408 || *status >= 500,
            LlmError::InvalidResponse(_)
            | LlmError::UnknownProvider(_)
            | LlmError::MissingApiKey { .. }
            | LlmError::Json(_) => false,
        }
    }

    /// The provider refused the credentials
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, LlmError::Api { status: 401 | 403, .. })
    }

    /// Suggested wait before asking again, for rate limits only
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            LlmError::RateLimited { retry_after, .. } => Some(*retry_after),
            _ => None,
        }
    }
}
