//! Wire types for the generation job API.

use serde::{Deserialize, Serialize};

use sceneflow_models::ReferenceImage;

/// A weighted reference image on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceImagePayload {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    pub weight: f64,
}

impl From<&ReferenceImage> for ReferenceImagePayload {
    fn from(image: &ReferenceImage) -> Self {
        Self {
            url: image.url.clone(),
            hint: image.hint.clone(),
            weight: image.weight,
        }
    }
}

/// Keyframe image generation job submission.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyframeJobRequest {
    pub prompt: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub reference_images: Vec<ReferenceImagePayload>,
}

/// Image-pair to video generation job submission.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoJobRequest {
    pub prompt: String,
    pub start_image_url: String,
    pub end_image_url: String,
}

/// Video composition job submission.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StitchJobRequest {
    pub clip_urls: Vec<String>,
    pub prompt: String,
}

/// Response to any job submission.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSubmitted {
    pub job_id: String,
}

/// Remote job lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Queued,
    Processing,
    Completed,
    Failed,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }
}

/// Polled job status.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatus {
    pub status: JobState,
    /// URL of the generated artifact, present on completion.
    pub result_url: Option<String>,
    /// Provider-assigned generation identifier, present on completion.
    pub generation_id: Option<String>,
    /// Artifact duration in seconds, present for video jobs.
    pub duration_seconds: Option<f64>,
    /// Failure detail, present on failure.
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_status_deserializes_completed() {
        let status: JobStatus = serde_json::from_str(
            r#"{"status":"completed","resultUrl":"https://cdn/x.mp4","generationId":"gen-1","durationSeconds":4.2}"#,
        )
        .unwrap();
        assert_eq!(status.status, JobState::Completed);
        assert_eq!(status.generation_id.as_deref(), Some("gen-1"));
    }

    #[test]
    fn test_job_status_tolerates_missing_fields() {
        let status: JobStatus = serde_json::from_str(r#"{"status":"processing"}"#).unwrap();
        assert!(!status.status.is_terminal());
        assert!(status.result_url.is_none());
    }

    #[test]
    fn test_keyframe_request_omits_empty_references() {
        let request = KeyframeJobRequest {
            prompt: "a quiet street".to_string(),
            reference_images: Vec::new(),
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(!json.contains("referenceImages"));
    }
}
