//! Collaborator seams for the pipeline.
//!
//! The controller and orchestrator talk to the outside world only through
//! these traits, so tests can drive every failure mode without network or
//! disk. Production implementations live in `adapters`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use sceneflow_docstore::FirestoreResult;
use sceneflow_genai::{GenAiResult, GeneratedImage, GeneratedVideo};
use sceneflow_media::{CompressionSettings, MediaResult};
use sceneflow_models::{ReferenceImage, Script, ScriptId};
use sceneflow_storage::{ObjectInfo, StorageResult};

use crate::error::PipelineResult;

/// Remote keyframe and video generation.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate_keyframe(
        &self,
        prompt: &str,
        references: &[ReferenceImage],
    ) -> GenAiResult<GeneratedImage>;

    async fn generate_video(
        &self,
        prompt: &str,
        start_image_url: &str,
        end_image_url: &str,
    ) -> GenAiResult<GeneratedVideo>;
}

/// Durable artifact storage with per-object metadata.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ArtifactStorage: Send + Sync {
    async fn upload_file(
        &self,
        path: &Path,
        key: &str,
        content_type: &str,
        metadata: &HashMap<String, String>,
    ) -> StorageResult<()>;

    async fn object_metadata(&self, key: &str)
        -> StorageResult<Option<HashMap<String, String>>>;

    async fn list_objects(&self, prefix: &str) -> StorageResult<Vec<ObjectInfo>>;

    async fn delete_prefix(&self, prefix: &str) -> StorageResult<u32>;

    /// Public URL an uploaded key is served from.
    fn public_url(&self, key: &str) -> String;
}

/// Local compression toward a size target.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaTransform: Send + Sync {
    async fn compress(
        &self,
        input: &Path,
        settings: &CompressionSettings,
    ) -> MediaResult<PathBuf>;
}

/// Remote video composition.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Stitcher: Send + Sync {
    async fn stitch(&self, clip_urls: &[String], prompt: &str) -> GenAiResult<String>;
}

/// Script document persistence.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ScriptStore: Send + Sync {
    async fn create(&self, script: &Script) -> FirestoreResult<()>;

    async fn load(&self, user_id: &str, script_id: &ScriptId) -> FirestoreResult<Option<Script>>;

    async fn list(&self, user_id: &str) -> FirestoreResult<Vec<Script>>;

    async fn save(&self, script: &Script) -> FirestoreResult<()>;

    async fn delete(&self, user_id: &str, script_id: &ScriptId) -> FirestoreResult<()>;
}

/// HTTP artifact download.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FileFetcher: Send + Sync {
    async fn fetch(&self, url: &str, dest: &Path) -> PipelineResult<()>;
}
