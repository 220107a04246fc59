//! Pipeline error types.

use thiserror::Error;

use sceneflow_docstore::FirestoreError;
use sceneflow_genai::GenAiError;
use sceneflow_media::MediaError;
use sceneflow_models::{FailureReason, TransitionError};
use sceneflow_storage::StorageError;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Errors surfaced by the scene controller and orchestrator.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Generation failed: {0}")]
    Generation(#[from] GenAiError),

    #[error("Storage operation failed: {0}")]
    Storage(#[from] StorageError),

    #[error("Media transform failed: {0}")]
    Media(#[from] MediaError),

    #[error("Document store operation failed: {0}")]
    DocStore(#[from] FirestoreError),

    #[error("Invalid scene transition: {0}")]
    Transition(#[from] TransitionError),

    #[error("Artifact download failed: {0}")]
    Download(String),

    #[error("Remote result carried no generation identifier")]
    MissingGenerationId,

    #[error("Upload failed after {attempts} attempts: {last_error}")]
    UploadExhausted { attempts: u32, last_error: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Script not found: {0}")]
    ScriptNotFound(String),

    #[error("Scene index {0} does not exist")]
    SceneNotFound(u32),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    pub fn download(msg: impl Into<String>) -> Self {
        Self::Download(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// The failure reason recorded on the scene for this error.
    pub fn failure_reason(&self) -> FailureReason {
        match self {
            Self::Generation(GenAiError::InvalidInput(_)) => FailureReason::InvalidInput,
            Self::Generation(GenAiError::RemoteRejected(_)) => FailureReason::RemoteRejected,
            Self::Generation(GenAiError::RemoteTimeout(_)) => FailureReason::RemoteTimeout,
            Self::Generation(_) => FailureReason::RemoteTransient,
            Self::MissingGenerationId => FailureReason::MissingGenerationId,
            Self::Download(_) => FailureReason::DownloadFailed,
            Self::Media(_) => FailureReason::TransformFailed,
            Self::Storage(_) | Self::UploadExhausted { .. } => FailureReason::UploadFailed,
            Self::InvalidInput(_) | Self::Transition(_) | Self::SceneNotFound(_) => {
                FailureReason::InvalidInput
            }
            Self::Io(_) => FailureReason::DownloadFailed,
            Self::DocStore(_) | Self::ScriptNotFound(_) => FailureReason::RemoteTransient,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_reason_mapping() {
        assert_eq!(
            PipelineError::MissingGenerationId.failure_reason(),
            FailureReason::MissingGenerationId
        );
        assert_eq!(
            PipelineError::Generation(GenAiError::RemoteTimeout(600)).failure_reason(),
            FailureReason::RemoteTimeout
        );
        assert_eq!(
            PipelineError::UploadExhausted {
                attempts: 3,
                last_error: "503".to_string()
            }
            .failure_reason(),
            FailureReason::UploadFailed
        );
        assert_eq!(
            PipelineError::download("connection reset").failure_reason(),
            FailureReason::DownloadFailed
        );
    }
}
