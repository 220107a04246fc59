//! Streaming HTTP download of generated artifacts.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::error::{PipelineError, PipelineResult};
use crate::traits::FileFetcher;

/// HTTP fetcher used to pull generated clips and composed videos to disk.
#[derive(Clone)]
pub struct HttpFetcher {
    http: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> PipelineResult<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            // No overall timeout: large clips stream for a while, and the
            // remote URL is already a terminal result.
            .build()
            .map_err(|e| PipelineError::download(e.to_string()))?;
        Ok(Self { http })
    }
}

#[async_trait]
impl FileFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, dest: &Path) -> PipelineResult<()> {
        debug!("Downloading {} to {}", url, dest.display());

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| PipelineError::download(format!("GET {} failed: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(PipelineError::download(format!(
                "GET {} returned {}",
                url,
                response.status()
            )));
        }

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = tokio::fs::File::create(dest).await?;
        let mut stream = response.bytes_stream();
        let mut written: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk =
                chunk.map_err(|e| PipelineError::download(format!("Stream error: {}", e)))?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        info!("Downloaded {} bytes from {} to {}", written, url, dest.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_fetch_writes_body_to_file() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/clip.mp4"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"fake mp4 bytes".to_vec()))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("nested/clip.mp4");

        let fetcher = HttpFetcher::new().unwrap();
        fetcher
            .fetch(&format!("{}/clip.mp4", server.uri()), &dest)
            .await
            .unwrap();

        let bytes = tokio::fs::read(&dest).await.unwrap();
        assert_eq!(bytes, b"fake mp4 bytes");
    }

    #[tokio::test]
    async fn test_fetch_surfaces_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing.mp4"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("missing.mp4");

        let fetcher = HttpFetcher::new().unwrap();
        let result = fetcher
            .fetch(&format!("{}/missing.mp4", server.uri()), &dest)
            .await;

        assert!(matches!(result, Err(PipelineError::Download(_))));
        assert!(!dest.exists());
    }
}
