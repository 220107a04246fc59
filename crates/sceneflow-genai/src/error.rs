//! Generation service error types.

use thiserror::Error;

/// Result type for generation operations.
pub type GenAiResult<T> = Result<T, GenAiError>;

/// Errors from the remote generation services.
#[derive(Debug, Error)]
pub enum GenAiError {
    /// Bad request input; never retried.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The remote service rejected the job (policy, bad prompt); never retried.
    #[error("Remote service rejected the job: {0}")]
    RemoteRejected(String),

    /// The job did not reach a terminal state within the wait bound.
    #[error("Remote job timed out after {0} seconds")]
    RemoteTimeout(u64),

    /// Transient remote failure (network, 5xx); retryable.
    #[error("Transient remote error: {0}")]
    RemoteTransient(String),

    /// The remote response was missing required fields.
    #[error("Invalid response from remote service: {0}")]
    InvalidResponse(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl GenAiError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn rejected(msg: impl Into<String>) -> Self {
        Self::RemoteRejected(msg.into())
    }

    pub fn transient(msg: impl Into<String>) -> Self {
        Self::RemoteTransient(msg.into())
    }

    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    /// True for failures worth retrying at a higher level.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RemoteTransient(_) | Self::Network(_))
    }
}
