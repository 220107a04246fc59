//! The per-scene pipeline state machine.
//!
//! Transitions are pure functions of (current state, event); the pipeline
//! controller owns the side effects and feeds their outcomes back as events.
//! This keeps the machine testable with no I/O.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Why a scene attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// Missing keyframe URL, empty prompt — never retried
    InvalidInput,
    /// Remote service rejected the prompt (policy, bad input)
    RemoteRejected,
    /// Remote generation exceeded the maximum wait bound
    RemoteTimeout,
    /// Transient remote error persisted through all retries
    RemoteTransient,
    /// Remote result carried no provider generation identifier
    MissingGenerationId,
    /// Artifact download failed
    DownloadFailed,
    /// Local compression/transcode failed — not retried for this input
    TransformFailed,
    /// Upload failed after all retry attempts
    UploadFailed,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::InvalidInput => "invalid_input",
            FailureReason::RemoteRejected => "remote_rejected",
            FailureReason::RemoteTimeout => "remote_timeout",
            FailureReason::RemoteTransient => "remote_transient",
            FailureReason::MissingGenerationId => "missing_generation_id",
            FailureReason::DownloadFailed => "download_failed",
            FailureReason::TransformFailed => "transform_failed",
            FailureReason::UploadFailed => "upload_failed",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Pipeline state of one scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case", tag = "state", content = "reason")]
pub enum SceneState {
    #[default]
    Pending,
    KeyframesGenerating,
    KeyframesReady,
    VideoGenerating,
    VideoDownloading,
    VideoCompressing,
    VideoUploading,
    Completed,
    Failed(FailureReason),
}

impl SceneState {
    /// Terminal for the current attempt. Regeneration re-enters the machine.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SceneState::Completed | SceneState::Failed(_))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SceneState::Pending => "pending",
            SceneState::KeyframesGenerating => "keyframes_generating",
            SceneState::KeyframesReady => "keyframes_ready",
            SceneState::VideoGenerating => "video_generating",
            SceneState::VideoDownloading => "video_downloading",
            SceneState::VideoCompressing => "video_compressing",
            SceneState::VideoUploading => "video_uploading",
            SceneState::Completed => "completed",
            SceneState::Failed(_) => "failed",
        }
    }
}

impl fmt::Display for SceneState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SceneState::Failed(reason) => write!(f, "failed({})", reason),
            other => write!(f, "{}", other.as_str()),
        }
    }
}

/// Events fed into the machine by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneEvent {
    /// Both keyframe prompts are non-empty; start keyframe generation
    StartKeyframes,
    /// Both keyframes resolved image URLs
    KeyframesCompleted,
    /// Keyframes are ready; start video generation
    StartVideo,
    /// Remote video generation reported a terminal success
    VideoGenerated,
    /// Artifact downloaded to local storage
    Downloaded,
    /// Local compression finished
    Compressed,
    /// Upload verified in the artifact store
    Uploaded,
    /// Any step failed with the given reason
    Fail(FailureReason),
    /// Re-enter at video generation, reusing existing keyframes
    RegenerateVideo,
    /// Re-enter at keyframe generation, redoing keyframes
    RegenerateKeyframes,
}

/// Rejected transition.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid transition: {event:?} in state {state}")]
pub struct TransitionError {
    pub state: SceneState,
    pub event: SceneEvent,
}

impl SceneState {
    /// Apply an event, returning the next state.
    ///
    /// `Fail` is accepted from any non-terminal state. Regeneration events
    /// are accepted from terminal states and from `KeyframesReady` (a scene
    /// whose keyframes were loaded from persisted state).
    pub fn transition(self, event: SceneEvent) -> Result<SceneState, TransitionError> {
        use SceneEvent::*;
        use SceneState::*;

        let next = match (self, event) {
            (Pending, StartKeyframes) => KeyframesGenerating,
            (KeyframesGenerating, KeyframesCompleted) => KeyframesReady,
            (KeyframesReady, StartVideo) => VideoGenerating,
            (VideoGenerating, VideoGenerated) => VideoDownloading,
            (VideoDownloading, Downloaded) => VideoCompressing,
            (VideoCompressing, Compressed) => VideoUploading,
            (VideoUploading, Uploaded) => Completed,

            (state, Fail(reason)) if !state.is_terminal() => Failed(reason),

            (Completed | Failed(_) | KeyframesReady, RegenerateVideo) => VideoGenerating,
            (Completed | Failed(_), RegenerateKeyframes) => KeyframesGenerating,

            (state, event) => return Err(TransitionError { state, event }),
        };
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn walk(start: SceneState, events: &[SceneEvent]) -> SceneState {
        events
            .iter()
            .fold(start, |s, e| s.transition(*e).expect("valid transition"))
    }

    #[test]
    fn test_happy_path() {
        let end = walk(
            SceneState::Pending,
            &[
                SceneEvent::StartKeyframes,
                SceneEvent::KeyframesCompleted,
                SceneEvent::StartVideo,
                SceneEvent::VideoGenerated,
                SceneEvent::Downloaded,
                SceneEvent::Compressed,
                SceneEvent::Uploaded,
            ],
        );
        assert_eq!(end, SceneState::Completed);
        assert!(end.is_terminal());
    }

    #[test]
    fn test_fail_reachable_from_any_non_terminal() {
        let non_terminal = [
            SceneState::Pending,
            SceneState::KeyframesGenerating,
            SceneState::KeyframesReady,
            SceneState::VideoGenerating,
            SceneState::VideoDownloading,
            SceneState::VideoCompressing,
            SceneState::VideoUploading,
        ];
        for state in non_terminal {
            let next = state
                .transition(SceneEvent::Fail(FailureReason::RemoteTransient))
                .unwrap();
            assert_eq!(next, SceneState::Failed(FailureReason::RemoteTransient));
        }
    }

    #[test]
    fn test_fail_rejected_in_terminal_states() {
        assert!(SceneState::Completed
            .transition(SceneEvent::Fail(FailureReason::UploadFailed))
            .is_err());
        assert!(SceneState::Failed(FailureReason::UploadFailed)
            .transition(SceneEvent::Fail(FailureReason::RemoteTimeout))
            .is_err());
    }

    #[test]
    fn test_regenerate_video_reuses_keyframes() {
        let next = SceneState::Completed
            .transition(SceneEvent::RegenerateVideo)
            .unwrap();
        assert_eq!(next, SceneState::VideoGenerating);

        let next = SceneState::Failed(FailureReason::MissingGenerationId)
            .transition(SceneEvent::RegenerateVideo)
            .unwrap();
        assert_eq!(next, SceneState::VideoGenerating);
    }

    #[test]
    fn test_regenerate_keyframes_restarts_earlier() {
        let next = SceneState::Failed(FailureReason::RemoteRejected)
            .transition(SceneEvent::RegenerateKeyframes)
            .unwrap();
        assert_eq!(next, SceneState::KeyframesGenerating);
    }

    #[test]
    fn test_out_of_order_events_rejected() {
        // Upload cannot complete before compression
        assert!(SceneState::VideoDownloading
            .transition(SceneEvent::Uploaded)
            .is_err());
        // Video may not start before keyframes are ready
        assert!(SceneState::KeyframesGenerating
            .transition(SceneEvent::StartVideo)
            .is_err());
    }

    #[test]
    fn test_failed_state_serde_carries_reason() {
        let state = SceneState::Failed(FailureReason::UploadFailed);
        let json = serde_json::to_string(&state).unwrap();
        let back: SceneState = serde_json::from_str(&json).unwrap();
        assert_eq!(state, back);
        assert!(json.contains("upload_failed"));
    }
}
