//! Scene and scene video models.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::ids::SceneId;
use crate::keyframe::Keyframe;
use crate::state::FailureReason;
use crate::status::GenerationStatus;

/// Metadata key carrying the provider-assigned generation identifier.
///
/// Required on every completed scene video; a result without it is unusable
/// for provenance and resume, and is treated as a failed attempt.
pub const GENERATION_ID_KEY: &str = "generationId";

/// Metadata key carrying the classified reason on a failed entry.
pub const FAILURE_REASON_KEY: &str = "failureReason";

/// One narrative beat of a script, mapped 1:1 to one generated clip.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Scene {
    /// Scene document id
    pub scene_id: SceneId,

    /// Stable position in the script; defines stitch order.
    /// Immutable after creation — reordering is delete-and-recreate.
    pub index: u32,

    /// Narrative text for this beat
    pub narrative: String,

    /// Keyframe marking the opening visual state
    #[serde(default)]
    pub start_keyframe: Keyframe,

    /// Keyframe marking the closing visual state
    #[serde(default)]
    pub end_keyframe: Keyframe,
}

impl Scene {
    /// Create a scene at the given index.
    pub fn new(index: u32, narrative: impl Into<String>) -> Self {
        Self {
            scene_id: SceneId::new(),
            index,
            narrative: narrative.into(),
            start_keyframe: Keyframe::default(),
            end_keyframe: Keyframe::default(),
        }
    }

    /// True when both keyframe prompts are present (keyframe generation may start).
    pub fn prompts_ready(&self) -> bool {
        !self.start_keyframe.prompt.trim().is_empty() && !self.end_keyframe.prompt.trim().is_empty()
    }

    /// True when both keyframes carry resolved image URLs (video generation may start).
    pub fn keyframes_ready(&self) -> bool {
        self.start_keyframe.is_ready() && self.end_keyframe.is_ready()
    }
}

/// A generated video clip for one scene.
///
/// At most one active entry exists per scene index; regeneration replaces
/// the entry rather than appending.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SceneVideo {
    /// Index of the owning scene
    pub scene_index: u32,

    /// Retrievable clip URL
    pub video_url: String,

    /// Clip duration in seconds
    #[serde(default)]
    pub duration_seconds: f64,

    /// Free-form artifact metadata. Must include the provider-assigned
    /// generation identifier once the clip is successfully produced.
    #[serde(default)]
    pub metadata: HashMap<String, String>,

    /// Generation status for this clip
    #[serde(default)]
    pub status: GenerationStatus,

    /// When this entry was produced
    pub created_at: DateTime<Utc>,
}

impl SceneVideo {
    /// Create a completed scene video entry.
    pub fn completed(
        scene_index: u32,
        video_url: impl Into<String>,
        duration_seconds: f64,
        metadata: HashMap<String, String>,
    ) -> Self {
        Self {
            scene_index,
            video_url: video_url.into(),
            duration_seconds,
            metadata,
            status: GenerationStatus::Completed,
            created_at: Utc::now(),
        }
    }

    /// Create a failed scene video entry.
    ///
    /// Persisted in place of a clip so a resumed process can tell a failed
    /// scene from one that was never attempted. Replaced by regeneration.
    pub fn failed(scene_index: u32, reason: FailureReason) -> Self {
        let mut metadata = HashMap::new();
        metadata.insert(FAILURE_REASON_KEY.to_string(), reason.to_string());
        Self {
            scene_index,
            video_url: String::new(),
            duration_seconds: 0.0,
            metadata,
            status: GenerationStatus::Failed,
            created_at: Utc::now(),
        }
    }

    /// The provider-assigned generation identifier, if present.
    pub fn generation_id(&self) -> Option<&str> {
        self.metadata.get(GENERATION_ID_KEY).map(String::as_str)
    }

    /// The recorded failure reason, if this entry represents a failed attempt.
    pub fn failure_reason(&self) -> Option<&str> {
        self.metadata.get(FAILURE_REASON_KEY).map(String::as_str)
    }

    /// True iff this entry is completed and carries a generation identifier.
    pub fn is_complete(&self) -> bool {
        self.status == GenerationStatus::Completed && self.generation_id().is_some()
    }
}
