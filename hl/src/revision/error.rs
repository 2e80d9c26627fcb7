//! Revision loop errors

use std::time::Duration;

use handlebars::RenderError;
use thiserror::Error;

use super::TurnState;
use crate::llm::LlmError;

/// Failure to obtain a response from the model
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("LLM request failed: {0}")]
    Llm(#[from] LlmError),

    #[error("Model returned an empty response")]
    EmptyResponse,

    #[error("Model declined to respond (blocked by provider)")]
    Blocked,
}

impl GenerationError {
    /// Worth retrying the same prompt later
    pub fn is_transient(&self) -> bool {
        match self {
            GenerationError::Llm(e) => e.is_retryable(),
            GenerationError::EmptyResponse => true,
            GenerationError::Blocked => false,
        }
    }
}

/// Errors surfaced by the revision engine
#[derive(Debug, Error)]
pub enum RevisionError {
    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Cannot {operation} a turn that is {state}")]
    InvalidState { operation: &'static str, state: TurnState },

    #[error("Revision limit reached ({limit} attempts)")]
    MaxRevisionsExceeded { limit: u32 },

    #[error("Failed to render revision prompt: {0}")]
    Prompt(#[from] RenderError),
}

impl RevisionError {
    /// The turn is left untouched and the same call can be retried
    pub fn is_retryable(&self) -> bool {
        matches!(self, RevisionError::Generation(e) if e.is_transient())
    }

    /// Provider-suggested wait when the failure was a rate limit
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            RevisionError::Generation(GenerationError::Llm(e)) => e.retry_after(),
            _ => None,
        }
    }
}
