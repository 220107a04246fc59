//! Script (project) model and derived project status.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ids::ScriptId;
use crate::scene::{Scene, SceneVideo};

/// Project-level status, derived from aggregate scene state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case", tag = "status", content = "scene_index")]
pub enum ScriptStatus {
    /// Draft text exists; no scenes generated yet
    #[default]
    Draft,
    /// Scene list is being generated from the draft
    GeneratingScript,
    /// User is editing keyframes; carries the active scene index
    EditingKeyframes(u32),
    /// Scene videos are being generated
    GeneratingVideo,
    /// Stitched output exists
    Completed,
    /// Surfaced aggregate failure
    Failed,
}

impl ScriptStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ScriptStatus::Completed | ScriptStatus::Failed)
    }
}

impl fmt::Display for ScriptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptStatus::Draft => write!(f, "draft"),
            ScriptStatus::GeneratingScript => write!(f, "generating_script"),
            ScriptStatus::EditingKeyframes(i) => write!(f, "editing_keyframes({})", i),
            ScriptStatus::GeneratingVideo => write!(f, "generating_video"),
            ScriptStatus::Completed => write!(f, "completed"),
            ScriptStatus::Failed => write!(f, "failed"),
        }
    }
}

/// A project: ordered scenes plus their generated videos.
///
/// Mutated only by the orchestrator and persisted wholesale after every step,
/// so a killed process loses at most one step of progress.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Script {
    /// Script document id
    pub script_id: ScriptId,

    /// Owning user
    pub user_id: String,

    /// Display title
    pub title: String,

    /// Draft narrative the scenes were generated from
    #[serde(default)]
    pub draft: String,

    /// Ordered scene list; position i holds the scene with index i
    #[serde(default)]
    pub scenes: Vec<Scene>,

    /// Generated clips, indexed by scene index. `None` = not yet generated.
    #[serde(default)]
    pub scene_videos: Vec<Option<SceneVideo>>,

    /// Derived project status
    #[serde(default)]
    pub status: ScriptStatus,

    /// URL of the stitched final video, once produced
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_video_url: Option<String>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Script {
    /// Create a new draft script.
    pub fn new(user_id: impl Into<String>, title: impl Into<String>, draft: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            script_id: ScriptId::new(),
            user_id: user_id.into(),
            title: title.into(),
            draft: draft.into(),
            scenes: Vec::new(),
            scene_videos: Vec::new(),
            status: ScriptStatus::Draft,
            final_video_url: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Number of scenes.
    pub fn scene_count(&self) -> usize {
        self.scenes.len()
    }

    /// The scene video at the given index, if generated.
    pub fn scene_video(&self, index: u32) -> Option<&SceneVideo> {
        self.scene_videos
            .get(index as usize)
            .and_then(|slot| slot.as_ref())
    }

    /// True iff every scene index in [0, N) has a completed scene video.
    ///
    /// This gate controls eligibility for stitching and is re-evaluated after
    /// every scene completion or deletion.
    pub fn all_scenes_complete(&self) -> bool {
        !self.scenes.is_empty()
            && self.scene_videos.len() == self.scenes.len()
            && self
                .scene_videos
                .iter()
                .all(|slot| slot.as_ref().is_some_and(|v| v.is_complete()))
    }

    /// Completed scene videos sorted ascending by scene index.
    ///
    /// Stitch order is always index order, never insertion order —
    /// regeneration can leave entries out of completion order.
    pub fn ordered_completed_videos(&self) -> Vec<&SceneVideo> {
        let mut videos: Vec<&SceneVideo> = self
            .scene_videos
            .iter()
            .filter_map(|slot| slot.as_ref())
            .filter(|v| v.is_complete())
            .collect();
        videos.sort_by_key(|v| v.scene_index);
        videos
    }

    /// Replace the scene video at an index, superseding any previous entry.
    ///
    /// The collection is rebuilt rather than patched in place so concurrent
    /// readers of a cloned script always see a consistent snapshot.
    pub fn set_scene_video(&mut self, video: SceneVideo) {
        let index = video.scene_index as usize;
        let len = self.scene_videos.len().max(index + 1).max(self.scenes.len());
        let mut rebuilt: Vec<Option<SceneVideo>> = Vec::with_capacity(len);
        for i in 0..len {
            if i == index {
                rebuilt.push(Some(video.clone()));
            } else {
                rebuilt.push(self.scene_videos.get(i).cloned().flatten());
            }
        }
        self.scene_videos = rebuilt;
        self.touch();
    }

    /// Remove the scene video at an index (e.g. before regeneration).
    pub fn clear_scene_video(&mut self, index: u32) {
        if let Some(slot) = self.scene_videos.get_mut(index as usize) {
            *slot = None;
            self.touch();
        }
    }

    /// Replay persisted state to derive the correct project status.
    ///
    /// The first scene with an incomplete keyframe pair becomes the active
    /// `EditingKeyframes` index; all keyframes done but clips missing means
    /// `GeneratingVideo`; a final video means `Completed`.
    pub fn derive_status(&self) -> ScriptStatus {
        if self.final_video_url.is_some() {
            return ScriptStatus::Completed;
        }
        if self.scenes.is_empty() {
            return ScriptStatus::Draft;
        }
        if let Some(scene) = self.scenes.iter().find(|s| !s.keyframes_ready()) {
            return ScriptStatus::EditingKeyframes(scene.index);
        }
        ScriptStatus::GeneratingVideo
    }

    /// Bump the updated_at timestamp.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::GENERATION_ID_KEY;
    use std::collections::HashMap;

    fn completed_video(index: u32) -> SceneVideo {
        let mut metadata = HashMap::new();
        metadata.insert(GENERATION_ID_KEY.to_string(), format!("gen-{}", index));
        SceneVideo::completed(index, format!("https://cdn/clip-{}.mp4", index), 4.0, metadata)
    }

    fn script_with_scenes(n: u32) -> Script {
        let mut script = Script::new("user-1", "Test", "draft text");
        for i in 0..n {
            let mut scene = Scene::new(i, format!("beat {}", i));
            scene.start_keyframe.complete(format!("https://cdn/s{}.png", i));
            scene.end_keyframe.complete(format!("https://cdn/e{}.png", i));
            script.scenes.push(scene);
        }
        script
    }

    #[test]
    fn test_all_scenes_complete_gate() {
        let mut script = script_with_scenes(3);
        assert!(!script.all_scenes_complete());

        script.set_scene_video(completed_video(0));
        script.set_scene_video(completed_video(2));
        assert!(!script.all_scenes_complete());

        script.set_scene_video(completed_video(1));
        assert!(script.all_scenes_complete());

        script.clear_scene_video(1);
        assert!(!script.all_scenes_complete());
    }

    #[test]
    fn test_empty_script_is_not_complete() {
        let script = Script::new("user-1", "Empty", "");
        assert!(!script.all_scenes_complete());
    }

    #[test]
    fn test_ordered_videos_sorted_by_index_not_completion_order() {
        let mut script = script_with_scenes(3);
        // Complete out of order: 2, 0, 1
        script.set_scene_video(completed_video(2));
        script.set_scene_video(completed_video(0));
        script.set_scene_video(completed_video(1));

        let ordered = script.ordered_completed_videos();
        let indices: Vec<u32> = ordered.iter().map(|v| v.scene_index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn test_set_scene_video_supersedes() {
        let mut script = script_with_scenes(3);
        let mut first = completed_video(2);
        first.video_url = "https://cdn/video-a.mp4".to_string();
        script.set_scene_video(first);

        let mut second = completed_video(2);
        second.video_url = "https://cdn/video-b.mp4".to_string();
        script.set_scene_video(second);

        let entries: Vec<_> = script
            .scene_videos
            .iter()
            .filter_map(|s| s.as_ref())
            .filter(|v| v.scene_index == 2)
            .collect();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].video_url, "https://cdn/video-b.mp4");
    }

    #[test]
    fn test_derive_status_replay() {
        let mut script = Script::new("user-1", "Replay", "draft");
        assert_eq!(script.derive_status(), ScriptStatus::Draft);

        script.scenes.push(Scene::new(0, "first"));
        script.scenes.push(Scene::new(1, "second"));
        assert_eq!(script.derive_status(), ScriptStatus::EditingKeyframes(0));

        script.scenes[0].start_keyframe.complete("https://cdn/a.png");
        script.scenes[0].end_keyframe.complete("https://cdn/b.png");
        assert_eq!(script.derive_status(), ScriptStatus::EditingKeyframes(1));

        script.scenes[1].start_keyframe.complete("https://cdn/c.png");
        script.scenes[1].end_keyframe.complete("https://cdn/d.png");
        assert_eq!(script.derive_status(), ScriptStatus::GeneratingVideo);

        script.final_video_url = Some("https://cdn/final.mp4".to_string());
        assert_eq!(script.derive_status(), ScriptStatus::Completed);
    }
}
