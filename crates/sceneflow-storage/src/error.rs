//! Storage error types.

use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to configure storage client: {0}")]
    ConfigError(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("List failed: {0}")]
    ListFailed(String),

    #[error("Metadata read failed: {0}")]
    MetadataFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound(key.into())
    }

    pub fn upload_failed(msg: impl Into<String>) -> Self {
        Self::UploadFailed(msg.into())
    }

    pub fn delete_failed(msg: impl Into<String>) -> Self {
        Self::DeleteFailed(msg.into())
    }

    /// Transient failures worth retrying at a higher level.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::UploadFailed(_) | Self::DownloadFailed(_))
    }
}
