//! Firestore error types.

use thiserror::Error;

/// Result type for Firestore operations.
pub type FirestoreResult<T> = Result<T, FirestoreError>;

/// Errors that can occur during Firestore operations.
#[derive(Debug, Error)]
pub enum FirestoreError {
    #[error("Authentication failed: {0}")]
    AuthError(String),

    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("Document already exists: {0}")]
    AlreadyExists(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Rate limited, retry after {0}ms")]
    RateLimited(u64),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FirestoreError {
    pub fn auth_error(msg: impl Into<String>) -> Self {
        Self::AuthError(msg.into())
    }

    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound(path.into())
    }

    pub fn request_failed(msg: impl Into<String>) -> Self {
        Self::RequestFailed(msg.into())
    }

    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    /// Map an HTTP status code to an error variant.
    pub fn from_http_status(status: u16, msg: String) -> Self {
        match status {
            401 | 403 => Self::PermissionDenied(msg),
            404 => Self::NotFound(msg),
            409 => Self::AlreadyExists(msg),
            429 => Self::RateLimited(1000),
            _ => Self::RequestFailed(msg),
        }
    }

    /// HTTP status this error maps back to, for metrics.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Self::AuthError(_) | Self::PermissionDenied(_) => Some(403),
            Self::NotFound(_) => Some(404),
            Self::AlreadyExists(_) => Some(409),
            Self::RateLimited(_) => Some(429),
            Self::RequestFailed(_) => Some(500),
            _ => None,
        }
    }

    /// Check if error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) | Self::RateLimited(_) => true,
            Self::RequestFailed(msg) => msg.contains("500") || msg.contains("503"),
            _ => false,
        }
    }

    /// Retry-After delay in milliseconds, if the server provided one.
    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            Self::RateLimited(ms) => Some(*ms),
            _ => None,
        }
    }
}
