//! Script-level orchestration.
//!
//! Owns the script lifecycle: scene creation, keyframe rounds, per-scene video
//! generation, resume from stored artifacts, final composition and deletion.
//! The script document is persisted wholesale after every step, so a killed
//! process resumes from the last completed step instead of starting over.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use sceneflow_models::{ReferenceImage, Scene, SceneVideo, Script, ScriptId, ScriptStatus};
use sceneflow_storage::keys;

use crate::config::PipelineConfig;
use crate::controller::{SceneController, SceneScope};
use crate::error::{PipelineError, PipelineResult};
use crate::traits::{ArtifactStorage, FileFetcher, ScriptStore, Stitcher};

/// Composition instruction sent along with the ordered clip list.
const STITCH_PROMPT: &str =
    "Join the clips in the given order with seamless cuts and consistent color grading.";

/// Narrative and keyframe prompts for one scene, supplied by the caller.
#[derive(Debug, Clone)]
pub struct SceneDraft {
    pub narrative: String,
    pub start_prompt: String,
    pub end_prompt: String,
}

type SceneLock = Arc<tokio::sync::Mutex<()>>;

/// Orchestrates a script through its full generation lifecycle.
pub struct ProjectOrchestrator {
    controller: SceneController,
    store: Arc<dyn ScriptStore>,
    storage: Arc<dyn ArtifactStorage>,
    stitcher: Arc<dyn Stitcher>,
    fetcher: Arc<dyn FileFetcher>,
    config: PipelineConfig,
    // One lock per (script, scene index): concurrent regeneration requests
    // for the same scene serialize, later-started wins via set_scene_video.
    scene_locks: tokio::sync::Mutex<HashMap<(String, u32), SceneLock>>,
}

impl ProjectOrchestrator {
    pub fn new(
        controller: SceneController,
        store: Arc<dyn ScriptStore>,
        storage: Arc<dyn ArtifactStorage>,
        stitcher: Arc<dyn Stitcher>,
        fetcher: Arc<dyn FileFetcher>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            controller,
            store,
            storage,
            stitcher,
            fetcher,
            config,
            scene_locks: tokio::sync::Mutex::new(HashMap::new()),
        }
    }

    /// Create and persist a new draft script.
    pub async fn create_script(
        &self,
        user_id: &str,
        title: &str,
        draft: &str,
    ) -> PipelineResult<Script> {
        let script = Script::new(user_id, title, draft);
        self.store.create(&script).await?;
        info!(script_id = %script.script_id, "Created draft script");
        Ok(script)
    }

    /// Load a script, failing when it does not exist.
    pub async fn load_script(
        &self,
        user_id: &str,
        script_id: &ScriptId,
    ) -> PipelineResult<Script> {
        self.store
            .load(user_id, script_id)
            .await?
            .ok_or_else(|| PipelineError::ScriptNotFound(script_id.to_string()))
    }

    /// All scripts belonging to a user.
    pub async fn list_scripts(&self, user_id: &str) -> PipelineResult<Vec<Script>> {
        Ok(self.store.list(user_id).await?)
    }

    /// Build the ordered scene list from per-scene drafts.
    ///
    /// Replaces any existing scenes and clears generated clips; scene indices
    /// are assigned by position and never change afterwards.
    pub async fn generate_scenes(
        &self,
        script: &mut Script,
        drafts: Vec<SceneDraft>,
    ) -> PipelineResult<()> {
        if drafts.is_empty() {
            return Err(PipelineError::invalid_input(
                "A script needs at least one scene",
            ));
        }

        script.status = ScriptStatus::GeneratingScript;
        self.store.save(script).await?;

        script.scenes = drafts
            .into_iter()
            .enumerate()
            .map(|(i, draft)| {
                let mut scene = Scene::new(i as u32, draft.narrative);
                scene.start_keyframe.prompt = draft.start_prompt;
                scene.end_keyframe.prompt = draft.end_prompt;
                scene
            })
            .collect();
        script.scene_videos = vec![None; script.scene_count()];
        script.final_video_url = None;
        script.status = script.derive_status();
        script.touch();

        self.store.save(script).await?;
        info!(
            script_id = %script.script_id,
            scene_count = script.scene_count(),
            "Scene list generated"
        );
        Ok(())
    }

    /// Generate both keyframes for one scene and persist the result.
    pub async fn generate_keyframes(
        &self,
        script: &mut Script,
        scene_index: u32,
        references: &[ReferenceImage],
    ) -> PipelineResult<()> {
        let scope = scope_of(script);
        let scene = scene_mut(script, scene_index)?;
        self.controller
            .generate_keyframes(&scope, scene, references)
            .await?;

        script.status = script.derive_status();
        script.touch();
        self.store.save(script).await?;
        Ok(())
    }

    /// Regenerate keyframes for a scene, invalidating any clip built on the
    /// previous pair.
    pub async fn regenerate_keyframes(
        &self,
        script: &mut Script,
        scene_index: u32,
        references: &[ReferenceImage],
    ) -> PipelineResult<()> {
        let lock = self.scene_lock(script, scene_index).await;
        let _guard = lock.lock().await;

        script.clear_scene_video(scene_index);
        let scope = scope_of(script);
        let scene = scene_mut(script, scene_index)?;
        self.controller
            .regenerate_keyframes(&scope, scene, references)
            .await?;

        script.status = script.derive_status();
        script.touch();
        self.store.save(script).await?;
        Ok(())
    }

    /// Check every scene has a ready keyframe pair and mark the script as
    /// generating video.
    pub async fn prepare_for_video_generation(&self, script: &mut Script) -> PipelineResult<()> {
        if script.scenes.is_empty() {
            return Err(PipelineError::invalid_input("No scenes to generate"));
        }
        if let Some(scene) = script.scenes.iter().find(|s| !s.keyframes_ready()) {
            return Err(PipelineError::invalid_input(format!(
                "Scene {} does not have a completed keyframe pair",
                scene.index
            )));
        }

        script.status = ScriptStatus::GeneratingVideo;
        script.touch();
        self.store.save(script).await?;
        Ok(())
    }

    /// Generate the video clip for one scene and persist the result.
    pub async fn generate_scene_video(
        &self,
        script: &mut Script,
        scene_index: u32,
    ) -> PipelineResult<()> {
        let lock = self.scene_lock(script, scene_index).await;
        let _guard = lock.lock().await;
        self.generate_scene_video_locked(script, scene_index).await
    }

    /// Regenerate the clip for one scene. The previous entry is cleared up
    /// front and superseded by the new result.
    pub async fn regenerate_scene_video(
        &self,
        script: &mut Script,
        scene_index: u32,
    ) -> PipelineResult<()> {
        let lock = self.scene_lock(script, scene_index).await;
        let _guard = lock.lock().await;

        script.clear_scene_video(scene_index);
        self.store.save(script).await?;
        self.generate_scene_video_locked(script, scene_index).await
    }

    async fn generate_scene_video_locked(
        &self,
        script: &mut Script,
        scene_index: u32,
    ) -> PipelineResult<()> {
        let scene = script
            .scenes
            .iter()
            .find(|s| s.index == scene_index)
            .cloned()
            .ok_or(PipelineError::SceneNotFound(scene_index))?;
        let scope = scope_of(script);

        match self.controller.generate_video(&scope, &scene).await {
            Ok(video) => {
                script.set_scene_video(video);
                script.status = ScriptStatus::GeneratingVideo;
                self.store.save(script).await?;
                Ok(())
            }
            Err(e) => {
                let reason = e.failure_reason();
                warn!(
                    scene_index,
                    script_id = %script.script_id,
                    reason = %reason,
                    "Scene video generation failed: {}", e
                );
                // Persist the failed entry so a resumed process can tell a
                // failed scene from one never attempted.
                script.set_scene_video(SceneVideo::failed(scene_index, reason));
                script.status = ScriptStatus::Failed;
                if let Err(save_err) = self.store.save(script).await {
                    warn!("Failed to persist failure status: {}", save_err);
                }
                Err(e)
            }
        }
    }

    /// Reconstruct completed scene videos from previously stored artifacts.
    ///
    /// Every scene that already has a verified clip in storage becomes
    /// completed without regeneration. Returns the number reconstructed.
    pub async fn load_existing_videos(&self, script: &mut Script) -> PipelineResult<u32> {
        let scope = scope_of(script);
        let mut reconstructed = 0u32;

        for index in 0..script.scene_count() as u32 {
            if script.scene_video(index).is_some_and(|v| v.is_complete()) {
                continue;
            }
            if let Some(video) = self.controller.load_existing_video(&scope, index).await? {
                script.set_scene_video(video);
                reconstructed += 1;
            }
        }

        if reconstructed > 0 {
            script.touch();
            self.store.save(script).await?;
            info!(
                script_id = %script.script_id,
                reconstructed,
                "Resumed completed scenes from storage"
            );
        }
        Ok(reconstructed)
    }

    /// Compose all scene clips into the final video.
    ///
    /// Requires every scene to have a completed clip. Clips are stitched in
    /// scene index order regardless of completion order. Composition is not
    /// retried automatically; a failure surfaces to the caller as-is.
    pub async fn generate_complete_video(&self, script: &mut Script) -> PipelineResult<String> {
        if !script.all_scenes_complete() {
            return Err(PipelineError::invalid_input(
                "All scenes must have completed videos before composing the final video",
            ));
        }

        let clip_urls: Vec<String> = script
            .ordered_completed_videos()
            .iter()
            .map(|v| v.video_url.clone())
            .collect();

        let span = info_span!("generate_complete_video", script_id = %script.script_id);
        let final_url = async {
            let composed_url = self.stitcher.stitch(&clip_urls, STITCH_PROMPT).await?;

            let local = self.final_work_path(script);
            self.fetcher.fetch(&composed_url, &local).await?;

            let key = keys::final_video_key(&script.user_id, &script.script_id.to_string());
            let metadata = self.final_metadata(script, clip_urls.len());
            let upload = self
                .storage
                .upload_file(&local, &key, "video/mp4", &metadata)
                .await;

            if let Err(e) = tokio::fs::remove_file(&local).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!("Failed to remove temporary final video: {}", e);
                }
            }
            upload?;

            Ok::<String, PipelineError>(self.storage.public_url(&key))
        }
        .instrument(span)
        .await?;

        script.final_video_url = Some(final_url.clone());
        script.status = ScriptStatus::Completed;
        script.touch();
        self.store.save(script).await?;

        info!(script_id = %script.script_id, url = %final_url, "Final video completed");
        Ok(final_url)
    }

    /// Delete a script document and, best-effort, its stored artifacts.
    ///
    /// The document delete is atomic; artifact cleanup failures are logged
    /// and do not fail the operation.
    pub async fn delete_script(&self, user_id: &str, script_id: &ScriptId) -> PipelineResult<()> {
        self.store.delete(user_id, script_id).await?;

        let scope = SceneScope {
            user_id: user_id.to_string(),
            script_id: script_id.to_string(),
        };
        self.controller.delete_artifacts(&scope).await;

        info!(script_id = %script_id, "Deleted script");
        Ok(())
    }

    async fn scene_lock(&self, script: &Script, scene_index: u32) -> SceneLock {
        let key = (script.script_id.to_string(), scene_index);
        let mut locks = self.scene_locks.lock().await;
        Arc::clone(locks.entry(key).or_default())
    }

    fn final_work_path(&self, script: &Script) -> PathBuf {
        self.config
            .work_dir
            .join(script.script_id.to_string())
            .join(format!("final-{}.mp4", Uuid::new_v4()))
    }

    fn final_metadata(&self, script: &Script, clip_count: usize) -> HashMap<String, String> {
        let mut metadata = HashMap::new();
        metadata.insert("userId".to_string(), script.user_id.clone());
        metadata.insert("scriptId".to_string(), script.script_id.to_string());
        metadata.insert("timestamp".to_string(), Utc::now().to_rfc3339());
        metadata.insert("clipCount".to_string(), clip_count.to_string());
        metadata.insert("model".to_string(), self.config.model_name.clone());
        metadata
    }
}

fn scope_of(script: &Script) -> SceneScope {
    SceneScope {
        user_id: script.user_id.clone(),
        script_id: script.script_id.to_string(),
    }
}

fn scene_mut(script: &mut Script, scene_index: u32) -> PipelineResult<&mut Scene> {
    script
        .scenes
        .iter_mut()
        .find(|s| s.index == scene_index)
        .ok_or(PipelineError::SceneNotFound(scene_index))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    use sceneflow_models::{GENERATION_ID_KEY, SceneVideo};
    use sceneflow_storage::ObjectInfo;

    use crate::traits::{
        MockArtifactStorage, MockFileFetcher, MockGenerator, MockMediaTransform, MockScriptStore,
        MockStitcher,
    };

    struct Mocks {
        generator: MockGenerator,
        storage: MockArtifactStorage,
        transform: MockMediaTransform,
        fetcher: MockFileFetcher,
        store: MockScriptStore,
        stitcher: MockStitcher,
    }

    impl Mocks {
        fn new() -> Self {
            Self {
                generator: MockGenerator::new(),
                storage: MockArtifactStorage::new(),
                transform: MockMediaTransform::new(),
                fetcher: MockFileFetcher::new(),
                store: MockScriptStore::new(),
                stitcher: MockStitcher::new(),
            }
        }

        fn saving_store(mut self) -> Self {
            self.store.expect_save().returning(|_| Ok(()));
            self
        }

        fn build(self) -> ProjectOrchestrator {
            let config = PipelineConfig {
                upload_base_delay: Duration::from_millis(1),
                work_dir: std::env::temp_dir()
                    .join(format!("sceneflow-orch-test-{}", Uuid::new_v4())),
                ..PipelineConfig::default()
            };
            let storage: Arc<dyn ArtifactStorage> = Arc::new(self.storage);
            let fetcher: Arc<dyn FileFetcher> = Arc::new(self.fetcher);
            let controller = SceneController::new(
                Arc::new(self.generator),
                Arc::clone(&storage),
                Arc::new(self.transform),
                Arc::clone(&fetcher),
                config.clone(),
            );
            ProjectOrchestrator::new(
                controller,
                Arc::new(self.store),
                storage,
                Arc::new(self.stitcher),
                fetcher,
                config,
            )
        }
    }

    fn completed_video(index: u32, url: &str) -> SceneVideo {
        let mut metadata = HashMap::new();
        metadata.insert(GENERATION_ID_KEY.to_string(), format!("gen-{}", index));
        SceneVideo::completed(index, url, 4.0, metadata)
    }

    fn script_with_completed_scenes(n: u32) -> Script {
        let mut script = Script::new("user-1", "Test", "draft");
        for i in 0..n {
            let mut scene = Scene::new(i, format!("beat {}", i));
            scene.start_keyframe.prompt = format!("start {}", i);
            scene.end_keyframe.prompt = format!("end {}", i);
            scene.start_keyframe.complete(format!("https://cdn/s{}.png", i));
            scene.end_keyframe.complete(format!("https://cdn/e{}.png", i));
            script.scenes.push(scene);
        }
        script.scene_videos = vec![None; n as usize];
        script
    }

    #[tokio::test]
    async fn test_generate_scenes_assigns_indices_in_order() {
        let orchestrator = Mocks::new().saving_store().build();
        let mut script = Script::new("user-1", "Test", "draft");

        let drafts = vec![
            SceneDraft {
                narrative: "opening".to_string(),
                start_prompt: "a".to_string(),
                end_prompt: "b".to_string(),
            },
            SceneDraft {
                narrative: "closing".to_string(),
                start_prompt: "c".to_string(),
                end_prompt: "d".to_string(),
            },
        ];

        orchestrator.generate_scenes(&mut script, drafts).await.unwrap();

        assert_eq!(script.scene_count(), 2);
        assert_eq!(script.scenes[0].index, 0);
        assert_eq!(script.scenes[1].index, 1);
        assert_eq!(script.scenes[1].narrative, "closing");
        assert_eq!(script.scene_videos.len(), 2);
        assert_eq!(script.status, ScriptStatus::EditingKeyframes(0));
    }

    #[tokio::test]
    async fn test_generate_scenes_rejects_empty_list() {
        let orchestrator = Mocks::new().build();
        let mut script = Script::new("user-1", "Test", "draft");

        let result = orchestrator.generate_scenes(&mut script, Vec::new()).await;
        assert!(matches!(result, Err(PipelineError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_complete_video_requires_all_scenes() {
        // Stitcher carries no expectations: any call would panic the test.
        let orchestrator = Mocks::new().build();

        let mut script = script_with_completed_scenes(3);
        script.set_scene_video(completed_video(0, "https://cdn/c0.mp4"));
        script.set_scene_video(completed_video(2, "https://cdn/c2.mp4"));

        let result = orchestrator.generate_complete_video(&mut script).await;
        assert!(matches!(result, Err(PipelineError::InvalidInput(_))));
        assert!(script.final_video_url.is_none());
    }

    #[tokio::test]
    async fn test_complete_video_stitches_in_index_order() {
        let stitched_urls = Arc::new(Mutex::new(Vec::new()));

        let mut mocks = Mocks::new();
        let seen = Arc::clone(&stitched_urls);
        mocks.stitcher.expect_stitch().returning(move |urls, _| {
            seen.lock().unwrap().extend_from_slice(urls);
            Ok("https://remote/composed.mp4".to_string())
        });
        mocks.fetcher.expect_fetch().returning(|_, dest| {
            if let Some(parent) = dest.parent() {
                std::fs::create_dir_all(parent).unwrap();
            }
            std::fs::write(dest, b"final bytes").unwrap();
            Ok(())
        });
        mocks
            .storage
            .expect_upload_file()
            .withf(|_, key, _, _| key.contains("/final/"))
            .returning(|_, _, _, _| Ok(()));
        mocks
            .storage
            .expect_public_url()
            .returning(|key| format!("https://cdn/{}", key));

        let orchestrator = mocks.saving_store().build();

        let mut script = script_with_completed_scenes(3);
        // Complete out of order: 2, 0, 1
        script.set_scene_video(completed_video(2, "https://cdn/c2.mp4"));
        script.set_scene_video(completed_video(0, "https://cdn/c0.mp4"));
        script.set_scene_video(completed_video(1, "https://cdn/c1.mp4"));

        let url = orchestrator
            .generate_complete_video(&mut script)
            .await
            .unwrap();

        assert_eq!(
            *stitched_urls.lock().unwrap(),
            vec![
                "https://cdn/c0.mp4".to_string(),
                "https://cdn/c1.mp4".to_string(),
                "https://cdn/c2.mp4".to_string(),
            ]
        );
        assert!(url.contains("/final/"));
        assert_eq!(script.final_video_url.as_deref(), Some(url.as_str()));
        assert_eq!(script.status, ScriptStatus::Completed);
    }

    #[tokio::test]
    async fn test_resume_reconstructs_without_regenerating() {
        let mut mocks = Mocks::new();
        // Generator carries no expectations: a regeneration would panic.
        mocks.storage.expect_list_objects().returning(|prefix| {
            Ok(vec![ObjectInfo {
                key: format!("{}clip-existing.mp4", prefix),
                size: 2048,
                last_modified: Some(1_700_000_000_000),
            }])
        });
        mocks.storage.expect_object_metadata().returning(|key| {
            let mut metadata = HashMap::new();
            metadata.insert(GENERATION_ID_KEY.to_string(), format!("gen-for-{}", key));
            metadata.insert("durationSeconds".to_string(), "4.0".to_string());
            Ok(Some(metadata))
        });
        mocks
            .storage
            .expect_public_url()
            .returning(|key| format!("https://cdn/{}", key));

        let orchestrator = mocks.saving_store().build();
        let mut script = script_with_completed_scenes(3);

        let reconstructed = orchestrator.load_existing_videos(&mut script).await.unwrap();

        assert_eq!(reconstructed, 3);
        assert!(script.all_scenes_complete());
    }

    #[tokio::test]
    async fn test_resume_is_idempotent() {
        let mut mocks = Mocks::new();
        mocks.storage.expect_list_objects().times(3).returning(|prefix| {
            Ok(vec![ObjectInfo {
                key: format!("{}clip-existing.mp4", prefix),
                size: 2048,
                last_modified: Some(1),
            }])
        });
        mocks.storage.expect_object_metadata().returning(|_| {
            let mut metadata = HashMap::new();
            metadata.insert(GENERATION_ID_KEY.to_string(), "gen-1".to_string());
            Ok(Some(metadata))
        });
        mocks
            .storage
            .expect_public_url()
            .returning(|key| format!("https://cdn/{}", key));

        let orchestrator = mocks.saving_store().build();
        let mut script = script_with_completed_scenes(3);

        assert_eq!(orchestrator.load_existing_videos(&mut script).await.unwrap(), 3);
        // Second pass finds every scene already complete and touches nothing.
        assert_eq!(orchestrator.load_existing_videos(&mut script).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_regeneration_supersedes_previous_clip() {
        let mut mocks = Mocks::new();
        mocks.generator.expect_generate_video().returning(|_, _, _| {
            Ok(sceneflow_genai::GeneratedVideo {
                video_url: "https://remote/new.mp4".to_string(),
                duration_seconds: 5.0,
                generation_id: Some("gen-new".to_string()),
            })
        });
        mocks.fetcher.expect_fetch().returning(|_, dest| {
            if let Some(parent) = dest.parent() {
                std::fs::create_dir_all(parent).unwrap();
            }
            std::fs::write(dest, b"clip").unwrap();
            Ok(())
        });
        mocks
            .transform
            .expect_compress()
            .returning(|input, _| Ok(input.to_path_buf()));
        mocks
            .storage
            .expect_upload_file()
            .returning(|_, _, _, _| Ok(()));
        mocks.storage.expect_object_metadata().returning(|_| {
            let mut metadata = HashMap::new();
            metadata.insert(GENERATION_ID_KEY.to_string(), "gen-new".to_string());
            Ok(Some(metadata))
        });
        mocks
            .storage
            .expect_public_url()
            .returning(|key| format!("https://cdn/{}", key));

        let orchestrator = mocks.saving_store().build();

        let mut script = script_with_completed_scenes(2);
        script.set_scene_video(completed_video(1, "https://cdn/old.mp4"));

        orchestrator
            .regenerate_scene_video(&mut script, 1)
            .await
            .unwrap();

        let entries: Vec<_> = script
            .scene_videos
            .iter()
            .filter_map(|s| s.as_ref())
            .filter(|v| v.scene_index == 1)
            .collect();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].generation_id(), Some("gen-new"));
        assert_ne!(entries[0].video_url, "https://cdn/old.mp4");
    }

    #[tokio::test]
    async fn test_scene_video_failure_marks_script_failed() {
        let mut mocks = Mocks::new();
        mocks.generator.expect_generate_video().returning(|_, _, _| {
            Err(sceneflow_genai::GenAiError::rejected("content policy"))
        });

        let orchestrator = mocks.saving_store().build();
        let mut script = script_with_completed_scenes(1);

        let result = orchestrator.generate_scene_video(&mut script, 0).await;
        assert!(result.is_err());
        assert_eq!(script.status, ScriptStatus::Failed);

        // The failure is recorded on the scene entry, not just the script,
        // so a resumed process sees which scene failed and why.
        let entry = script.scene_video(0).expect("failed entry persisted");
        assert!(!entry.is_complete());
        assert_eq!(entry.failure_reason(), Some("remote_rejected"));
        assert!(!script.all_scenes_complete());
    }

    #[tokio::test]
    async fn test_regeneration_clears_persisted_failure() {
        let mut mocks = Mocks::new();
        mocks.generator.expect_generate_video().returning(|_, _, _| {
            Ok(sceneflow_genai::GeneratedVideo {
                video_url: "https://remote/retake.mp4".to_string(),
                duration_seconds: 4.0,
                generation_id: Some("gen-retake".to_string()),
            })
        });
        mocks.fetcher.expect_fetch().returning(|_, dest| {
            if let Some(parent) = dest.parent() {
                std::fs::create_dir_all(parent).unwrap();
            }
            std::fs::write(dest, b"clip").unwrap();
            Ok(())
        });
        mocks
            .transform
            .expect_compress()
            .returning(|input, _| Ok(input.to_path_buf()));
        mocks
            .storage
            .expect_upload_file()
            .returning(|_, _, _, _| Ok(()));
        mocks.storage.expect_object_metadata().returning(|_| {
            let mut metadata = HashMap::new();
            metadata.insert(GENERATION_ID_KEY.to_string(), "gen-retake".to_string());
            Ok(Some(metadata))
        });
        mocks
            .storage
            .expect_public_url()
            .returning(|key| format!("https://cdn/{}", key));

        let orchestrator = mocks.saving_store().build();

        let mut script = script_with_completed_scenes(1);
        script.set_scene_video(SceneVideo::failed(
            0,
            sceneflow_models::FailureReason::UploadFailed,
        ));

        orchestrator
            .regenerate_scene_video(&mut script, 0)
            .await
            .unwrap();

        let entry = script.scene_video(0).expect("regenerated entry");
        assert!(entry.is_complete());
        assert!(entry.failure_reason().is_none());
    }

    #[tokio::test]
    async fn test_unknown_scene_index_rejected() {
        let orchestrator = Mocks::new().build();
        let mut script = script_with_completed_scenes(2);

        let result = orchestrator.generate_scene_video(&mut script, 7).await;
        assert!(matches!(result, Err(PipelineError::SceneNotFound(7))));
    }

    #[tokio::test]
    async fn test_scene_locks_keyed_by_script_and_index() {
        let orchestrator = Mocks::new().build();
        let script_a = script_with_completed_scenes(2);
        let script_b = script_with_completed_scenes(2);

        let a0 = orchestrator.scene_lock(&script_a, 0).await;
        let a0_again = orchestrator.scene_lock(&script_a, 0).await;
        let a1 = orchestrator.scene_lock(&script_a, 1).await;
        let b0 = orchestrator.scene_lock(&script_b, 0).await;

        assert!(Arc::ptr_eq(&a0, &a0_again));
        assert!(!Arc::ptr_eq(&a0, &a1));
        assert!(!Arc::ptr_eq(&a0, &b0));
    }

    #[tokio::test]
    async fn test_delete_script_removes_document_and_artifacts() {
        let deleted_prefix = Arc::new(Mutex::new(String::new()));

        let mut mocks = Mocks::new();
        mocks.store.expect_delete().times(1).returning(|_, _| Ok(()));
        let seen = Arc::clone(&deleted_prefix);
        mocks.storage.expect_delete_prefix().returning(move |prefix| {
            *seen.lock().unwrap() = prefix.to_string();
            Ok(4)
        });

        let orchestrator = mocks.build();
        let script_id = ScriptId::new();

        orchestrator.delete_script("user-1", &script_id).await.unwrap();

        let prefix = deleted_prefix.lock().unwrap();
        assert!(prefix.contains("user-1"));
        assert!(prefix.contains(&script_id.to_string()));
    }

    #[tokio::test]
    async fn test_delete_script_tolerates_artifact_cleanup_failure() {
        let mut mocks = Mocks::new();
        mocks.store.expect_delete().returning(|_, _| Ok(()));
        mocks.storage.expect_delete_prefix().returning(|_| {
            Err(sceneflow_storage::StorageError::delete_failed("bucket offline"))
        });

        let orchestrator = mocks.build();
        let result = orchestrator.delete_script("user-1", &ScriptId::new()).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_prepare_rejects_incomplete_keyframes() {
        let orchestrator = Mocks::new().build();

        let mut script = script_with_completed_scenes(2);
        script.scenes[1].end_keyframe.reset();

        let result = orchestrator.prepare_for_video_generation(&mut script).await;
        assert!(matches!(result, Err(PipelineError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_prepare_marks_generating_video() {
        let orchestrator = Mocks::new().saving_store().build();
        let mut script = script_with_completed_scenes(2);

        orchestrator
            .prepare_for_video_generation(&mut script)
            .await
            .unwrap();
        assert_eq!(script.status, ScriptStatus::GeneratingVideo);
    }

    #[tokio::test]
    async fn test_load_script_missing_is_error() {
        let mut mocks = Mocks::new();
        mocks.store.expect_load().returning(|_, _| Ok(None));

        let orchestrator = mocks.build();
        let result = orchestrator.load_script("user-1", &ScriptId::new()).await;
        assert!(matches!(result, Err(PipelineError::ScriptNotFound(_))));
    }

    #[tokio::test]
    async fn test_list_scripts_passes_through() {
        let mut mocks = Mocks::new();
        mocks
            .store
            .expect_list()
            .returning(|user_id| Ok(vec![Script::new(user_id, "One", ""), Script::new(user_id, "Two", "")]));

        let orchestrator = mocks.build();
        let scripts = orchestrator.list_scripts("user-1").await.unwrap();
        assert_eq!(scripts.len(), 2);
        assert!(scripts.iter().all(|s| s.user_id == "user-1"));
    }
}
