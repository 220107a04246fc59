//! Keyframe and video generation client.

use std::time::{Duration, Instant};

use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use sceneflow_models::{ReferenceImage, MAX_REFERENCE_IMAGES};

use crate::error::{GenAiError, GenAiResult};
use crate::types::{
    JobState, JobStatus, JobSubmitted, KeyframeJobRequest, ReferenceImagePayload, VideoJobRequest,
};

/// Configuration for the generation services.
#[derive(Debug, Clone)]
pub struct GenAiConfig {
    /// Service base URL
    pub base_url: String,
    /// API key sent as a bearer token
    pub api_key: String,
    /// Delay between status polls
    pub poll_interval: Duration,
    /// Upper bound on total wait for one job
    pub max_wait: Duration,
    /// Per-request HTTP timeout
    pub request_timeout: Duration,
}

impl GenAiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> GenAiResult<Self> {
        let base_url = std::env::var("GENAI_BASE_URL")
            .map_err(|_| GenAiError::invalid_input("GENAI_BASE_URL not set"))?;
        let api_key = std::env::var("GENAI_API_KEY")
            .map_err(|_| GenAiError::invalid_input("GENAI_API_KEY not set"))?;

        let poll_interval_ms: u64 = std::env::var("GENAI_POLL_INTERVAL_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(3000);

        let max_wait_secs: u64 = std::env::var("GENAI_MAX_WAIT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(600);

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            poll_interval: Duration::from_millis(poll_interval_ms),
            max_wait: Duration::from_secs(max_wait_secs),
            request_timeout: Duration::from_secs(30),
        })
    }
}

/// A generated keyframe image.
#[derive(Debug, Clone)]
pub struct GeneratedImage {
    pub image_url: String,
    pub generation_id: Option<String>,
}

/// A generated scene video.
#[derive(Debug, Clone)]
pub struct GeneratedVideo {
    pub video_url: String,
    pub duration_seconds: f64,
    /// Provider-assigned generation identifier. The pipeline refuses results
    /// without one; provenance is required for resume correctness.
    pub generation_id: Option<String>,
}

/// Client for the keyframe and video generation job APIs.
#[derive(Clone)]
pub struct GenerationClient {
    http: Client,
    config: GenAiConfig,
}

impl GenerationClient {
    pub fn new(config: GenAiConfig) -> GenAiResult<Self> {
        let http = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(GenAiError::Network)?;
        Ok(Self { http, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> GenAiResult<Self> {
        Self::new(GenAiConfig::from_env()?)
    }

    /// Generate a keyframe image, waiting for the job to complete.
    pub async fn generate_keyframe(
        &self,
        prompt: &str,
        reference_images: &[ReferenceImage],
    ) -> GenAiResult<GeneratedImage> {
        validate_prompt(prompt)?;
        validate_references(reference_images)?;

        let request = KeyframeJobRequest {
            prompt: prompt.to_string(),
            reference_images: reference_images
                .iter()
                .map(ReferenceImagePayload::from)
                .collect(),
        };

        let job = self.submit("/v1/keyframes", &request).await?;
        debug!(job_id = %job.job_id, "Submitted keyframe generation job");

        let status = self.poll_to_completion(&job.job_id).await?;
        let image_url = status.result_url.ok_or_else(|| {
            GenAiError::invalid_response("Completed keyframe job carried no result URL")
        })?;

        info!(job_id = %job.job_id, "Keyframe generated");
        Ok(GeneratedImage {
            image_url,
            generation_id: status.generation_id,
        })
    }

    /// Generate a video from a start/end keyframe pair, waiting for the job
    /// to complete.
    pub async fn generate_video(
        &self,
        prompt: &str,
        start_image_url: &str,
        end_image_url: &str,
    ) -> GenAiResult<GeneratedVideo> {
        validate_prompt(prompt)?;
        if start_image_url.is_empty() || end_image_url.is_empty() {
            return Err(GenAiError::invalid_input(
                "Video generation requires both keyframe image URLs",
            ));
        }

        let request = VideoJobRequest {
            prompt: prompt.to_string(),
            start_image_url: start_image_url.to_string(),
            end_image_url: end_image_url.to_string(),
        };

        let job = self.submit("/v1/videos", &request).await?;
        debug!(job_id = %job.job_id, "Submitted video generation job");

        let status = self.poll_to_completion(&job.job_id).await?;
        let video_url = status.result_url.ok_or_else(|| {
            GenAiError::invalid_response("Completed video job carried no result URL")
        })?;

        info!(
            job_id = %job.job_id,
            generation_id = status.generation_id.as_deref().unwrap_or("<absent>"),
            "Video generated"
        );
        Ok(GeneratedVideo {
            video_url,
            duration_seconds: status.duration_seconds.unwrap_or(0.0),
            generation_id: status.generation_id,
        })
    }

    /// Submit a job and decode the submission response.
    pub(crate) async fn submit<R: Serialize>(
        &self,
        path: &str,
        request: &R,
    ) -> GenAiResult<JobSubmitted> {
        let url = format!("{}{}", self.config.base_url, path);

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| GenAiError::transient(format!("Job submission failed: {}", e)))?;

        decode_response(response).await
    }

    /// Poll a job until it reaches a terminal state or the wait bound.
    pub(crate) async fn poll_to_completion(&self, job_id: &str) -> GenAiResult<JobStatus> {
        let url = format!("{}/v1/jobs/{}", self.config.base_url, job_id);
        let started = Instant::now();

        loop {
            if started.elapsed() >= self.config.max_wait {
                warn!(job_id = %job_id, "Job exceeded wait bound");
                return Err(GenAiError::RemoteTimeout(self.config.max_wait.as_secs()));
            }

            let response = self
                .http
                .get(&url)
                .bearer_auth(&self.config.api_key)
                .send()
                .await;

            match response {
                Ok(response) => {
                    let status: JobStatus = decode_response(response).await?;
                    match status.status {
                        JobState::Completed => return Ok(status),
                        JobState::Failed => {
                            return Err(GenAiError::rejected(
                                status
                                    .error
                                    .unwrap_or_else(|| "Job failed without detail".to_string()),
                            ));
                        }
                        JobState::Queued | JobState::Processing => {}
                    }
                }
                // Polling hiccups are absorbed; the wait bound still applies.
                Err(e) => warn!(job_id = %job_id, "Status poll failed, will retry: {}", e),
            }

            tokio::time::sleep(self.config.poll_interval).await;
        }
    }
}

/// Map an HTTP response to a decoded body or the right error class.
pub(crate) async fn decode_response<T: DeserializeOwned>(response: Response) -> GenAiResult<T> {
    let status = response.status();

    if status.is_success() {
        return Ok(response.json::<T>().await?);
    }

    let body = response.text().await.unwrap_or_default();
    match status {
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY | StatusCode::FORBIDDEN => {
            Err(GenAiError::rejected(format!("{}: {}", status, body)))
        }
        s if s.is_server_error() || s == StatusCode::TOO_MANY_REQUESTS => {
            Err(GenAiError::transient(format!("{}: {}", status, body)))
        }
        s => Err(GenAiError::invalid_response(format!("{}: {}", s, body))),
    }
}

fn validate_prompt(prompt: &str) -> GenAiResult<()> {
    if prompt.trim().is_empty() {
        return Err(GenAiError::invalid_input("Prompt must not be empty"));
    }
    Ok(())
}

fn validate_references(images: &[ReferenceImage]) -> GenAiResult<()> {
    if images.len() > MAX_REFERENCE_IMAGES {
        return Err(GenAiError::invalid_input(format!(
            "At most {} reference images are allowed, got {}",
            MAX_REFERENCE_IMAGES,
            images.len()
        )));
    }
    for image in images {
        if !(0.0..=1.0).contains(&image.weight) {
            return Err(GenAiError::invalid_input(format!(
                "Reference image weight {} is outside [0, 1]",
                image.weight
            )));
        }
    }
    Ok(())
}
