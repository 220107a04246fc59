//! Production implementations of the collaborator traits.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use sceneflow_docstore::{FirestoreResult, ScriptRepository};
use sceneflow_genai::{GenAiResult, GeneratedImage, GeneratedVideo, GenerationClient, StitchClient};
use sceneflow_media::{CompressionSettings, MediaResult};
use sceneflow_models::{ReferenceImage, Script, ScriptId};
use sceneflow_storage::{ArtifactStore, ObjectInfo, StorageResult};

use crate::traits::{ArtifactStorage, Generator, MediaTransform, ScriptStore, Stitcher};

#[async_trait]
impl Generator for GenerationClient {
    async fn generate_keyframe(
        &self,
        prompt: &str,
        references: &[ReferenceImage],
    ) -> GenAiResult<GeneratedImage> {
        GenerationClient::generate_keyframe(self, prompt, references).await
    }

    async fn generate_video(
        &self,
        prompt: &str,
        start_image_url: &str,
        end_image_url: &str,
    ) -> GenAiResult<GeneratedVideo> {
        GenerationClient::generate_video(self, prompt, start_image_url, end_image_url).await
    }
}

#[async_trait]
impl ArtifactStorage for ArtifactStore {
    async fn upload_file(
        &self,
        path: &Path,
        key: &str,
        content_type: &str,
        metadata: &HashMap<String, String>,
    ) -> StorageResult<()> {
        ArtifactStore::upload_file(self, path, key, content_type, metadata).await
    }

    async fn object_metadata(
        &self,
        key: &str,
    ) -> StorageResult<Option<HashMap<String, String>>> {
        ArtifactStore::object_metadata(self, key).await
    }

    async fn list_objects(&self, prefix: &str) -> StorageResult<Vec<ObjectInfo>> {
        ArtifactStore::list_objects(self, prefix).await
    }

    async fn delete_prefix(&self, prefix: &str) -> StorageResult<u32> {
        ArtifactStore::delete_prefix(self, prefix).await
    }

    fn public_url(&self, key: &str) -> String {
        ArtifactStore::public_url(self, key)
    }
}

/// FFmpeg-backed compression.
#[derive(Debug, Clone, Default)]
pub struct FfmpegTransform;

#[async_trait]
impl MediaTransform for FfmpegTransform {
    async fn compress(
        &self,
        input: &Path,
        settings: &CompressionSettings,
    ) -> MediaResult<PathBuf> {
        sceneflow_media::compress(input, settings).await
    }
}

#[async_trait]
impl Stitcher for StitchClient {
    async fn stitch(&self, clip_urls: &[String], prompt: &str) -> GenAiResult<String> {
        StitchClient::stitch(self, clip_urls, prompt).await
    }
}

#[async_trait]
impl ScriptStore for ScriptRepository {
    async fn create(&self, script: &Script) -> FirestoreResult<()> {
        ScriptRepository::create(self, script).await
    }

    async fn load(&self, user_id: &str, script_id: &ScriptId) -> FirestoreResult<Option<Script>> {
        ScriptRepository::load(self, user_id, script_id).await
    }

    async fn list(&self, user_id: &str) -> FirestoreResult<Vec<Script>> {
        ScriptRepository::list(self, user_id).await
    }

    async fn save(&self, script: &Script) -> FirestoreResult<()> {
        ScriptRepository::save(self, script).await
    }

    async fn delete(&self, user_id: &str, script_id: &ScriptId) -> FirestoreResult<()> {
        ScriptRepository::delete(self, user_id, script_id).await
    }
}
