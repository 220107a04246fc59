//! Per-scene pipeline controller.
//!
//! Drives one scene through keyframe generation, video generation, download,
//! compression, upload and verification. Every step feeds the pure state
//! machine in `sceneflow_models::state`, so an out-of-order step is a bug
//! caught at the transition, not a silent corruption.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use sceneflow_genai::{GenAiError, GeneratedImage, GeneratedVideo};
use sceneflow_models::{
    video_prompt, KeyframePosition, ReferenceImage, Scene, SceneEvent, SceneState, SceneVideo,
    GENERATION_ID_KEY,
};
use sceneflow_storage::keys;

use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::retry::{retry_async, RetryOutcome, RetryPolicy};
use crate::traits::{ArtifactStorage, FileFetcher, Generator, MediaTransform};

/// Identity of the script a scene belongs to, threaded through storage keys
/// and artifact metadata.
#[derive(Debug, Clone)]
pub struct SceneScope {
    pub user_id: String,
    pub script_id: String,
}

/// Controller for a single scene's generation pipeline.
pub struct SceneController {
    generator: Arc<dyn Generator>,
    storage: Arc<dyn ArtifactStorage>,
    transform: Arc<dyn MediaTransform>,
    fetcher: Arc<dyn FileFetcher>,
    config: PipelineConfig,
}

impl SceneController {
    pub fn new(
        generator: Arc<dyn Generator>,
        storage: Arc<dyn ArtifactStorage>,
        transform: Arc<dyn MediaTransform>,
        fetcher: Arc<dyn FileFetcher>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            generator,
            storage,
            transform,
            fetcher,
            config,
        }
    }

    /// Generate both keyframes for a scene.
    ///
    /// The start and end keyframes are independent, so they generate
    /// concurrently. `references` are attached to both slots. Generated
    /// images are mirrored into durable storage; the scene records the
    /// served URL, not the provider's short-lived one.
    pub async fn generate_keyframes(
        &self,
        scope: &SceneScope,
        scene: &mut Scene,
        references: &[ReferenceImage],
    ) -> PipelineResult<()> {
        if !scene.prompts_ready() {
            return Err(PipelineError::invalid_input(
                "Both keyframe prompts must be non-empty before generation",
            ));
        }

        let mut state = SceneState::Pending.transition(SceneEvent::StartKeyframes)?;
        debug!(scene_index = scene.index, state = %state, "Keyframe generation started");

        scene.start_keyframe.reference_images = references.to_vec();
        scene.end_keyframe.reference_images = references.to_vec();

        let span = info_span!("generate_keyframes", scene_index = scene.index);
        let (start, end) = async {
            tokio::join!(
                self.generate_keyframe_with_retry(&scene.start_keyframe.prompt, references),
                self.generate_keyframe_with_retry(&scene.end_keyframe.prompt, references),
            )
        }
        .instrument(span)
        .await;

        let start = start?;
        let end = end?;

        let start_url = self
            .persist_keyframe(scope, scene.index, KeyframePosition::Start, &start.image_url)
            .await?;
        let end_url = self
            .persist_keyframe(scope, scene.index, KeyframePosition::End, &end.image_url)
            .await?;

        scene.start_keyframe.complete(start_url);
        scene.end_keyframe.complete(end_url);

        state = state.transition(SceneEvent::KeyframesCompleted)?;
        info!(scene_index = scene.index, state = %state, "Keyframes ready");
        Ok(())
    }

    /// Regenerate both keyframes, discarding previous image URLs.
    pub async fn regenerate_keyframes(
        &self,
        scope: &SceneScope,
        scene: &mut Scene,
        references: &[ReferenceImage],
    ) -> PipelineResult<()> {
        scene.start_keyframe.reset();
        scene.end_keyframe.reset();
        self.generate_keyframes(scope, scene, references).await
    }

    /// Mirror a generated keyframe image into storage, returning the URL it
    /// is served from.
    async fn persist_keyframe(
        &self,
        scope: &SceneScope,
        scene_index: u32,
        position: KeyframePosition,
        remote_url: &str,
    ) -> PipelineResult<String> {
        let local = self
            .config
            .work_dir
            .join(&scope.script_id)
            .join(format!("scene-{}", scene_index))
            .join(format!("keyframe-{}-{}.png", position.as_str(), Uuid::new_v4()));
        self.fetch_artifact(remote_url, &local).await?;

        let key = keys::keyframe_key(
            &scope.user_id,
            &scope.script_id,
            scene_index,
            position.as_str(),
        );
        let result = self
            .storage
            .upload_file(&local, &key, "image/png", &HashMap::new())
            .await;
        self.cleanup(&[&local]).await;
        result?;

        Ok(self.storage.public_url(&key))
    }

    /// Run the full video pipeline for one scene with ready keyframes:
    /// generate, download, compress, upload with retry, verify, clean up.
    pub async fn generate_video(
        &self,
        scope: &SceneScope,
        scene: &Scene,
    ) -> PipelineResult<SceneVideo> {
        let span = info_span!(
            "generate_scene_video",
            scene_index = scene.index,
            script_id = %scope.script_id
        );
        let started = std::time::Instant::now();
        let result = self.generate_video_inner(scope, scene).instrument(span).await;

        let status = if result.is_ok() { "completed" } else { "failed" };
        metrics::counter!("pipeline_scene_videos_total", "status" => status).increment(1);
        metrics::histogram!("pipeline_scene_video_seconds")
            .record(started.elapsed().as_secs_f64());
        result
    }

    async fn generate_video_inner(
        &self,
        scope: &SceneScope,
        scene: &Scene,
    ) -> PipelineResult<SceneVideo> {
        let (start_url, end_url) = match (
            scene.start_keyframe.image_url.as_deref(),
            scene.end_keyframe.image_url.as_deref(),
        ) {
            (Some(s), Some(e)) if scene.keyframes_ready() => (s, e),
            _ => {
                return Err(PipelineError::invalid_input(
                    "Video generation requires both keyframes completed with image URLs",
                ))
            }
        };

        let mut state = SceneState::KeyframesReady.transition(SceneEvent::StartVideo)?;

        let prompt = video_prompt(
            &scene.narrative,
            &scene.start_keyframe.prompt,
            &scene.end_keyframe.prompt,
        );

        let generated = self
            .generate_video_with_retry(&prompt, start_url, end_url)
            .await?;
        state = state.transition(SceneEvent::VideoGenerated)?;

        // A result without provenance is unusable for resume and debugging.
        let generation_id = generated
            .generation_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .ok_or(PipelineError::MissingGenerationId)?;

        let source_path = self.scene_work_path(scope, scene.index);
        let mut compressed: Option<PathBuf> = None;

        let staged = async {
            self.fetch_artifact(&generated.video_url, &source_path).await?;
            state = state.transition(SceneEvent::Downloaded)?;

            let path = self
                .transform
                .compress(&source_path, &self.config.compression())
                .await?;
            compressed = Some(path.clone());
            state = state.transition(SceneEvent::Compressed)?;

            let file_size = tokio::fs::metadata(&path).await?.len();
            let metadata = self.clip_metadata(
                scope,
                scene,
                &generation_id,
                file_size,
                generated.duration_seconds,
            );

            let key = self
                .upload_with_retry(scope, scene.index, &path, &metadata)
                .await?;
            Ok::<(String, HashMap<String, String>), PipelineError>((key, metadata))
        }
        .await;

        // Temporary files go regardless of where the attempt ended.
        let mut temps: Vec<&Path> = vec![source_path.as_path()];
        if let Some(path) = compressed.as_deref() {
            temps.push(path);
        }
        self.cleanup(&temps).await;

        let (key, metadata) = staged?;
        state = state.transition(SceneEvent::Uploaded)?;
        info!(scene_index = scene.index, state = %state, key = %key, "Scene video completed");

        Ok(SceneVideo::completed(
            scene.index,
            self.storage.public_url(&key),
            generated.duration_seconds,
            metadata,
        ))
    }

    fn remote_policy(&self, operation: &str) -> RetryPolicy {
        RetryPolicy::new(operation)
            .with_max_attempts(self.config.remote_max_attempts)
            .with_base_delay(self.config.remote_base_delay)
    }

    /// Keyframe generation with backoff on transient remote failures.
    /// Rejections and invalid input surface immediately.
    async fn generate_keyframe_with_retry(
        &self,
        prompt: &str,
        references: &[ReferenceImage],
    ) -> PipelineResult<GeneratedImage> {
        let policy = self.remote_policy("generate_keyframe");
        match retry_async(&policy, GenAiError::is_retryable, || {
            self.generator.generate_keyframe(prompt, references)
        })
        .await
        {
            RetryOutcome::Success(image) => Ok(image),
            RetryOutcome::Exhausted { error, .. } => Err(error.into()),
        }
    }

    /// Video generation with backoff on transient remote failures.
    async fn generate_video_with_retry(
        &self,
        prompt: &str,
        start_image_url: &str,
        end_image_url: &str,
    ) -> PipelineResult<GeneratedVideo> {
        let policy = self.remote_policy("generate_video");
        match retry_async(&policy, GenAiError::is_retryable, || {
            self.generator
                .generate_video(prompt, start_image_url, end_image_url)
        })
        .await
        {
            RetryOutcome::Success(video) => Ok(video),
            RetryOutcome::Exhausted { error, .. } => Err(error.into()),
        }
    }

    /// Artifact download with backoff; interrupted transfers are transient.
    async fn fetch_artifact(&self, url: &str, dest: &Path) -> PipelineResult<()> {
        let policy = self.remote_policy("download_artifact");
        match retry_async(
            &policy,
            |e: &PipelineError| matches!(e, PipelineError::Download(_) | PipelineError::Io(_)),
            || self.fetcher.fetch(url, dest),
        )
        .await
        {
            RetryOutcome::Success(()) => Ok(()),
            RetryOutcome::Exhausted { error, .. } => Err(error),
        }
    }

    /// Upload the clip, minting a fresh destination key per attempt and
    /// verifying the metadata readback before accepting the attempt.
    async fn upload_with_retry(
        &self,
        scope: &SceneScope,
        scene_index: u32,
        path: &Path,
        metadata: &HashMap<String, String>,
    ) -> PipelineResult<String> {
        let policy = RetryPolicy::new("upload_scene_video")
            .with_max_attempts(self.config.upload_max_attempts)
            .with_base_delay(self.config.upload_base_delay);

        let outcome = retry_async(
            &policy,
            |e: &PipelineError| matches!(e, PipelineError::Storage(s) if s.is_retryable()),
            || async {
                // Fresh key per attempt: a partially written object from a
                // failed attempt is never re-read or clobbered.
                let key = keys::scene_video_key(&scope.user_id, &scope.script_id, scene_index);
                self.storage
                    .upload_file(path, &key, "video/mp4", metadata)
                    .await?;
                self.verify_upload(&key, metadata).await?;
                Ok::<String, PipelineError>(key)
            },
        )
        .await;

        match outcome {
            RetryOutcome::Success(key) => Ok(key),
            RetryOutcome::Exhausted { error, attempts } => Err(PipelineError::UploadExhausted {
                attempts,
                last_error: error.to_string(),
            }),
        }
    }

    /// Read back object metadata and confirm the generation id round-tripped.
    async fn verify_upload(
        &self,
        key: &str,
        expected: &HashMap<String, String>,
    ) -> PipelineResult<()> {
        let stored = self
            .storage
            .object_metadata(key)
            .await?
            .ok_or_else(|| {
                PipelineError::Storage(sceneflow_storage::StorageError::upload_failed(format!(
                    "Uploaded object {} not visible on readback",
                    key
                )))
            })?;

        if stored.get(GENERATION_ID_KEY) != expected.get(GENERATION_ID_KEY) {
            return Err(PipelineError::Storage(
                sceneflow_storage::StorageError::upload_failed(format!(
                    "Generation id missing from readback of {}",
                    key
                )),
            ));
        }
        Ok(())
    }

    /// Reconstruct a completed scene video from previously uploaded artifacts.
    ///
    /// Lists the scene-scoped prefix and accepts the newest clip whose
    /// metadata carries a generation id. Returns `None` when nothing usable
    /// exists; the scene then goes through normal generation.
    pub async fn load_existing_video(
        &self,
        scope: &SceneScope,
        scene_index: u32,
    ) -> PipelineResult<Option<SceneVideo>> {
        let prefix = keys::scene_video_prefix(&scope.user_id, &scope.script_id, scene_index);
        let mut objects = self.storage.list_objects(&prefix).await?;
        objects.sort_by_key(|o| std::cmp::Reverse(o.last_modified));

        for object in objects {
            let Some(metadata) = self.storage.object_metadata(&object.key).await? else {
                continue;
            };
            if !metadata.contains_key(GENERATION_ID_KEY) {
                debug!(key = %object.key, "Skipping clip without generation id");
                continue;
            }

            let duration = metadata
                .get("durationSeconds")
                .and_then(|d| d.parse::<f64>().ok())
                .unwrap_or(0.0);

            info!(
                scene_index,
                key = %object.key,
                "Reconstructed completed scene from stored artifact"
            );
            return Ok(Some(SceneVideo::completed(
                scene_index,
                self.storage.public_url(&object.key),
                duration,
                metadata,
            )));
        }

        Ok(None)
    }

    /// Best-effort removal of every stored artifact for a script.
    pub async fn delete_artifacts(&self, scope: &SceneScope) {
        let prefix = keys::script_prefix(&scope.user_id, &scope.script_id);
        match self.storage.delete_prefix(&prefix).await {
            Ok(count) => debug!(script_id = %scope.script_id, count, "Deleted stored artifacts"),
            Err(e) => warn!(
                script_id = %scope.script_id,
                "Failed to delete stored artifacts (continuing): {}", e
            ),
        }
    }

    fn scene_work_path(&self, scope: &SceneScope, scene_index: u32) -> PathBuf {
        self.config
            .work_dir
            .join(&scope.script_id)
            .join(format!("scene-{}", scene_index))
            .join(format!("source-{}.mp4", Uuid::new_v4()))
    }

    fn clip_metadata(
        &self,
        scope: &SceneScope,
        scene: &Scene,
        generation_id: &str,
        file_size: u64,
        duration_seconds: f64,
    ) -> HashMap<String, String> {
        let mut metadata = HashMap::new();
        metadata.insert("sceneId".to_string(), scene.scene_id.to_string());
        metadata.insert("sceneIndex".to_string(), scene.index.to_string());
        metadata.insert("userId".to_string(), scope.user_id.clone());
        metadata.insert("scriptId".to_string(), scope.script_id.clone());
        metadata.insert("timestamp".to_string(), Utc::now().to_rfc3339());
        metadata.insert("model".to_string(), self.config.model_name.clone());
        metadata.insert("fileSize".to_string(), file_size.to_string());
        metadata.insert("durationSeconds".to_string(), duration_seconds.to_string());
        metadata.insert(GENERATION_ID_KEY.to_string(), generation_id.to_string());
        metadata
    }

    async fn cleanup(&self, paths: &[&Path]) {
        for path in paths {
            if let Err(e) = tokio::fs::remove_file(path).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!("Failed to remove temporary file {}: {}", path.display(), e);
                }
            }
        }
    }
}
