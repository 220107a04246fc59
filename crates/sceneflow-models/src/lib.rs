//! Shared data models for the sceneflow pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Scripts, scenes, keyframes and generated scene videos
//! - Generation and project status enums
//! - The pure per-scene state machine driven by the pipeline controller
//! - Prompt composition for visually coherent clip generation

pub mod ids;
pub mod keyframe;
pub mod prompt;
pub mod scene;
pub mod script;
pub mod state;
pub mod status;

// Re-export common types
pub use ids::{SceneId, ScriptId};
pub use keyframe::{Keyframe, KeyframePosition, ReferenceImage, MAX_REFERENCE_IMAGES};
pub use prompt::video_prompt;
pub use scene::{Scene, SceneVideo, FAILURE_REASON_KEY, GENERATION_ID_KEY};
pub use script::{Script, ScriptStatus};
pub use state::{FailureReason, SceneEvent, SceneState, TransitionError};
pub use status::GenerationStatus;
