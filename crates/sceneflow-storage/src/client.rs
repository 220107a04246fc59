//! S3-compatible artifact store client.

use std::collections::HashMap;
use std::path::Path;

use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::{Builder, Region};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use tracing::{debug, info};

use crate::error::{StorageError, StorageResult};

/// Configuration for the artifact store.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// S3 API endpoint URL
    pub endpoint_url: String,
    /// Access key ID
    pub access_key_id: String,
    /// Secret access key
    pub secret_access_key: String,
    /// Bucket name
    pub bucket_name: String,
    /// Region ("auto" for R2-style endpoints)
    pub region: String,
    /// Public base URL objects are served from (CDN or bucket website)
    pub public_base_url: String,
}

impl StoreConfig {
    /// Create config from environment variables.
    pub fn from_env() -> StorageResult<Self> {
        Ok(Self {
            endpoint_url: std::env::var("STORE_ENDPOINT_URL")
                .map_err(|_| StorageError::config_error("STORE_ENDPOINT_URL not set"))?,
            access_key_id: std::env::var("STORE_ACCESS_KEY_ID")
                .map_err(|_| StorageError::config_error("STORE_ACCESS_KEY_ID not set"))?,
            secret_access_key: std::env::var("STORE_SECRET_ACCESS_KEY")
                .map_err(|_| StorageError::config_error("STORE_SECRET_ACCESS_KEY not set"))?,
            bucket_name: std::env::var("STORE_BUCKET_NAME")
                .map_err(|_| StorageError::config_error("STORE_BUCKET_NAME not set"))?,
            region: std::env::var("STORE_REGION").unwrap_or_else(|_| "auto".to_string()),
            public_base_url: std::env::var("STORE_PUBLIC_BASE_URL")
                .map_err(|_| StorageError::config_error("STORE_PUBLIC_BASE_URL not set"))?,
        })
    }
}

/// Artifact store over any S3-compatible backend.
#[derive(Clone)]
pub struct ArtifactStore {
    client: Client,
    bucket: String,
    public_base_url: String,
}

impl ArtifactStore {
    /// Create a new store from configuration.
    pub async fn new(config: StoreConfig) -> StorageResult<Self> {
        let credentials = Credentials::new(
            &config.access_key_id,
            &config.secret_access_key,
            None,
            None,
            "sceneflow",
        );

        let sdk_config = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .endpoint_url(&config.endpoint_url)
            .region(Region::new(config.region))
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();

        Ok(Self {
            client: Client::from_conf(sdk_config),
            bucket: config.bucket_name,
            public_base_url: config.public_base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Create from environment variables.
    pub async fn from_env() -> StorageResult<Self> {
        Self::new(StoreConfig::from_env()?).await
    }

    /// Public URL an uploaded object is served from.
    pub fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_base_url, key)
    }

    /// Upload a file with per-object metadata.
    ///
    /// Metadata is written atomically with the object body, so an object
    /// visible under a key always carries its metadata.
    pub async fn upload_file(
        &self,
        path: impl AsRef<Path>,
        key: &str,
        content_type: &str,
        metadata: &HashMap<String, String>,
    ) -> StorageResult<()> {
        let path = path.as_ref();
        debug!("Uploading {} to {}", path.display(), key);

        let body = ByteStream::from_path(path)
            .await
            .map_err(|e| StorageError::upload_failed(e.to_string()))?;

        let mut request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(body)
            .content_type(content_type);

        for (k, v) in metadata {
            request = request.metadata(k, v);
        }

        request
            .send()
            .await
            .map_err(|e| StorageError::upload_failed(e.to_string()))?;

        info!("Uploaded {} to {}", path.display(), key);
        Ok(())
    }

    /// Read an object's metadata. Returns `None` if the object does not exist.
    pub async fn object_metadata(
        &self,
        key: &str,
    ) -> StorageResult<Option<HashMap<String, String>>> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(head) => Ok(Some(head.metadata().cloned().unwrap_or_default())),
            Err(e) => {
                let msg = e.to_string();
                if msg.contains("NotFound") || msg.contains("NoSuchKey") {
                    Ok(None)
                } else {
                    Err(StorageError::MetadataFailed(msg))
                }
            }
        }
    }

    /// Download an object to a local file.
    pub async fn download_file(&self, key: &str, path: impl AsRef<Path>) -> StorageResult<()> {
        let path = path.as_ref();
        debug!("Downloading {} to {}", key, path.display());

        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                if e.to_string().contains("NoSuchKey") {
                    StorageError::not_found(key)
                } else {
                    StorageError::DownloadFailed(e.to_string())
                }
            })?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let bytes = response
            .body
            .collect()
            .await
            .map_err(|e| StorageError::DownloadFailed(e.to_string()))?
            .into_bytes();

        tokio::fs::write(path, &bytes).await?;

        info!("Downloaded {} to {}", key, path.display());
        Ok(())
    }

    /// Delete an object. Deleting a missing object succeeds.
    pub async fn delete_object(&self, key: &str) -> StorageResult<()> {
        debug!("Deleting {}", key);

        match self
            .client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(()),
            Err(e) => {
                let msg = e.to_string();
                if msg.contains("NotFound") || msg.contains("NoSuchKey") {
                    debug!("Object {} already gone", key);
                    Ok(())
                } else {
                    Err(StorageError::delete_failed(msg))
                }
            }
        }
    }

    /// Delete every object under a prefix. Returns the number deleted.
    pub async fn delete_prefix(&self, prefix: &str) -> StorageResult<u32> {
        let keys: Vec<String> = self
            .list_objects(prefix)
            .await?
            .into_iter()
            .map(|o| o.key)
            .collect();

        if keys.is_empty() {
            return Ok(0);
        }

        let objects: Vec<_> = keys
            .iter()
            .map(|k| {
                aws_sdk_s3::types::ObjectIdentifier::builder()
                    .key(k)
                    .build()
                    .map_err(|e| StorageError::delete_failed(e.to_string()))
            })
            .collect::<StorageResult<_>>()?;

        let delete = aws_sdk_s3::types::Delete::builder()
            .set_objects(Some(objects))
            .quiet(true)
            .build()
            .map_err(|e| StorageError::delete_failed(e.to_string()))?;

        self.client
            .delete_objects()
            .bucket(&self.bucket)
            .delete(delete)
            .send()
            .await
            .map_err(|e| StorageError::delete_failed(e.to_string()))?;

        info!("Deleted {} objects under {}", keys.len(), prefix);
        Ok(keys.len() as u32)
    }

    /// List objects under a prefix, following pagination.
    pub async fn list_objects(&self, prefix: &str) -> StorageResult<Vec<ObjectInfo>> {
        debug!("Listing objects with prefix: {}", prefix);

        let mut objects = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let mut request = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(prefix);

            if let Some(token) = continuation_token {
                request = request.continuation_token(token);
            }

            let response = request
                .send()
                .await
                .map_err(|e| StorageError::ListFailed(e.to_string()))?;

            for obj in response.contents() {
                objects.push(ObjectInfo {
                    key: obj.key().unwrap_or_default().to_string(),
                    size: obj.size().unwrap_or(0) as u64,
                    last_modified: obj
                        .last_modified()
                        .and_then(|t| t.to_millis().ok())
                        .map(|ms| ms as u64),
                });
            }

            if response.is_truncated() == Some(true) {
                continuation_token = response.next_continuation_token().map(String::from);
            } else {
                break;
            }
        }

        Ok(objects)
    }
}

/// Information about a stored object.
#[derive(Debug, Clone)]
pub struct ObjectInfo {
    /// Object key
    pub key: String,
    /// Size in bytes
    pub size: u64,
    /// Last modified timestamp (milliseconds since epoch)
    pub last_modified: Option<u64>,
}
