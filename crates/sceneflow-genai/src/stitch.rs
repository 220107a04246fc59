//! Remote video composition (stitching) client.

use tracing::{debug, info};

use crate::client::GenerationClient;
use crate::error::{GenAiError, GenAiResult};
use crate::types::StitchJobRequest;

/// Client for the video composition service.
///
/// There is no automatic retry here: composition is expensive, and a
/// failed stitch is surfaced to the orchestrator uninterpreted so retrying
/// stays a deliberate caller decision.
#[derive(Clone)]
pub struct StitchClient {
    inner: GenerationClient,
}

impl StitchClient {
    pub fn new(inner: GenerationClient) -> Self {
        Self { inner }
    }

    /// Compose ordered clips into one video and return its URL.
    ///
    /// `clip_urls` must already be sorted by ascending scene index; this
    /// client does not reorder.
    pub async fn stitch(&self, clip_urls: &[String], prompt: &str) -> GenAiResult<String> {
        if clip_urls.is_empty() {
            return Err(GenAiError::invalid_input(
                "Stitching requires at least one clip",
            ));
        }

        let request = StitchJobRequest {
            clip_urls: clip_urls.to_vec(),
            prompt: prompt.to_string(),
        };

        let job = self.inner.submit("/v1/stitch", &request).await?;
        debug!(job_id = %job.job_id, clips = clip_urls.len(), "Submitted stitch job");

        let status = self.inner.poll_to_completion(&job.job_id).await?;
        let composed_url = status.result_url.ok_or_else(|| {
            GenAiError::invalid_response("Completed stitch job carried no result URL")
        })?;

        info!(job_id = %job.job_id, "Stitch complete");
        Ok(composed_url)
    }
}
