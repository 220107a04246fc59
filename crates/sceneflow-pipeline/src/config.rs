//! Pipeline configuration.

use std::path::PathBuf;
use std::time::Duration;

use sceneflow_media::CompressionSettings;

/// Tunables for the scene pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Width cap for compressed scene clips, in pixels.
    pub max_width: u32,
    /// Target compressed clip size, in bytes.
    pub target_size_bytes: u64,
    /// Upload attempts per clip (including the first).
    pub upload_max_attempts: u32,
    /// Backoff base delay for upload retries; doubles per attempt.
    pub upload_base_delay: Duration,
    /// Attempts per remote generation or artifact download (including the
    /// first). Only transient failures consume retries.
    pub remote_max_attempts: u32,
    /// Backoff base delay for remote retries; doubles per attempt.
    pub remote_base_delay: Duration,
    /// Scratch directory for downloaded and compressed clips.
    pub work_dir: PathBuf,
    /// Model label recorded in clip metadata.
    pub model_name: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_width: 1080,
            target_size_bytes: 5 * 1024 * 1024,
            upload_max_attempts: 3,
            upload_base_delay: Duration::from_secs(2),
            remote_max_attempts: 3,
            remote_base_delay: Duration::from_secs(2),
            work_dir: std::env::temp_dir().join("sceneflow"),
            model_name: "scene-video-1".to_string(),
        }
    }
}

impl PipelineConfig {
    /// Create config from environment variables, with defaults for the rest.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            max_width: env_parse("PIPELINE_MAX_WIDTH", defaults.max_width),
            target_size_bytes: env_parse("PIPELINE_TARGET_SIZE_BYTES", defaults.target_size_bytes),
            upload_max_attempts: env_parse(
                "PIPELINE_UPLOAD_MAX_ATTEMPTS",
                defaults.upload_max_attempts,
            ),
            upload_base_delay: Duration::from_millis(env_parse(
                "PIPELINE_UPLOAD_BASE_DELAY_MS",
                defaults.upload_base_delay.as_millis() as u64,
            )),
            remote_max_attempts: env_parse(
                "PIPELINE_REMOTE_MAX_ATTEMPTS",
                defaults.remote_max_attempts,
            ),
            remote_base_delay: Duration::from_millis(env_parse(
                "PIPELINE_REMOTE_BASE_DELAY_MS",
                defaults.remote_base_delay.as_millis() as u64,
            )),
            work_dir: std::env::var("PIPELINE_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
            model_name: std::env::var("PIPELINE_MODEL_NAME").unwrap_or(defaults.model_name),
        }
    }

    /// Compression settings derived from this config.
    pub fn compression(&self) -> CompressionSettings {
        CompressionSettings {
            max_width: self.max_width,
            target_size_bytes: self.target_size_bytes,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}
