//! Firestore REST API client.
//!
//! Production-grade client with:
//! - Token caching with refresh margin
//! - HTTP client tuning (pooling, timeouts)
//! - Exponential backoff with jitter
//! - Observability (tracing spans, metrics)

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use gcp_auth::{CustomServiceAccount, TokenProvider};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use tracing::{info_span, Instrument};

use crate::error::{FirestoreError, FirestoreResult};
use crate::metrics::record_request;
use crate::retry::RetryConfig;
use crate::token_cache::TokenCache;
use crate::types::{
    BatchWriteRequest, BatchWriteResponse, Document, ListDocumentsResponse, Value, Write,
};

/// Firestore client configuration.
#[derive(Debug, Clone)]
pub struct FirestoreConfig {
    /// GCP project ID
    pub project_id: String,
    /// Database ID (usually "(default)")
    pub database_id: String,
    /// Request timeout
    pub timeout: Duration,
    /// Connect timeout
    pub connect_timeout: Duration,
    /// Retry configuration
    pub retry: RetryConfig,
}

impl FirestoreConfig {
    /// Create config from environment variables.
    pub fn from_env() -> FirestoreResult<Self> {
        let project_id = std::env::var("GCP_PROJECT_ID")
            .or_else(|_| std::env::var("FIREBASE_PROJECT_ID"))
            .map_err(|_| {
                FirestoreError::auth_error(
                    "GCP_PROJECT_ID or FIREBASE_PROJECT_ID must be set to access Firestore",
                )
            })?;

        if project_id.is_empty() {
            return Err(FirestoreError::auth_error(
                "GCP_PROJECT_ID or FIREBASE_PROJECT_ID cannot be empty",
            ));
        }

        let connect_timeout_secs: u64 = std::env::var("FIRESTORE_CONNECT_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(5);

        Ok(Self {
            project_id,
            database_id: std::env::var("FIRESTORE_DATABASE_ID")
                .unwrap_or_else(|_| "(default)".to_string()),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(connect_timeout_secs),
            retry: RetryConfig::from_env(),
        })
    }
}

/// Firestore REST API client.
pub struct FirestoreClient {
    http: Client,
    config: FirestoreConfig,
    base_url: String,
    token_cache: Arc<TokenCache>,
}

impl Clone for FirestoreClient {
    fn clone(&self) -> Self {
        Self {
            http: self.http.clone(),
            config: self.config.clone(),
            base_url: self.base_url.clone(),
            token_cache: Arc::clone(&self.token_cache),
        }
    }
}

impl FirestoreClient {
    /// Create a new Firestore client.
    pub async fn new(config: FirestoreConfig) -> FirestoreResult<Self> {
        let auth = Self::create_auth_provider()?;

        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .user_agent(concat!("sceneflow-docstore/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(FirestoreError::Network)?;

        let base_url = format!(
            "https://firestore.googleapis.com/v1/projects/{}/databases/{}/documents",
            config.project_id, config.database_id
        );

        Ok(Self {
            http,
            config,
            base_url,
            token_cache: Arc::new(TokenCache::new(auth)),
        })
    }

    fn create_auth_provider() -> FirestoreResult<Arc<dyn TokenProvider>> {
        let service_account = CustomServiceAccount::from_env().map_err(|e| {
            FirestoreError::auth_error(format!("Failed to load service account: {}", e))
        })?;

        match service_account {
            Some(sa) => Ok(Arc::new(sa)),
            None => Err(FirestoreError::auth_error(
                "GOOGLE_APPLICATION_CREDENTIALS not set. \
                 Set it to the path of your service account JSON file.",
            )),
        }
    }

    /// Create from environment variables.
    pub async fn from_env() -> FirestoreResult<Self> {
        let config = FirestoreConfig::from_env()?;
        Self::new(config).await
    }

    fn is_access_token_expired(body: &str) -> bool {
        body.contains("ACCESS_TOKEN_EXPIRED") || body.contains("\"UNAUTHENTICATED\"")
    }

    /// Build document path.
    fn document_path(&self, collection: &str, doc_id: &str) -> String {
        format!("{}/{}/{}", self.base_url, collection, doc_id)
    }

    /// Full resource name for batch operations.
    pub fn full_document_name(&self, collection: &str, doc_id: &str) -> String {
        format!(
            "projects/{}/databases/{}/documents/{}/{}",
            self.config.project_id, self.config.database_id, collection, doc_id
        )
    }

    /// Send a request with a bearer token, re-authenticating once if the
    /// cached token expired mid-flight.
    async fn send_authorized<F>(&self, build: F) -> FirestoreResult<Response>
    where
        F: Fn() -> RequestBuilder,
    {
        let token = self.token_cache.get_token().await?;
        let response = build().bearer_auth(&token).send().await?;

        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        if !Self::is_access_token_expired(&body) {
            return Err(FirestoreError::from_http_status(401, body));
        }

        self.token_cache.invalidate().await;
        let token = self.token_cache.get_token().await?;
        Ok(build().bearer_auth(&token).send().await?)
    }

    async fn error_from(status: StatusCode, url: &str, response: Response) -> FirestoreError {
        let body = response.text().await.unwrap_or_default();
        FirestoreError::from_http_status(status.as_u16(), format!("{} failed: {}", url, body))
    }

    /// Get a document. Returns `None` if it does not exist.
    pub async fn get_document(
        &self,
        collection: &str,
        doc_id: &str,
    ) -> FirestoreResult<Option<Document>> {
        let url = self.document_path(collection, doc_id);

        self.execute_request("get_document", collection, Some(doc_id), async {
            let response = self.send_authorized(|| self.http.get(&url)).await?;
            match response.status() {
                StatusCode::OK => Ok(Some(response.json::<Document>().await?)),
                StatusCode::NOT_FOUND => Ok(None),
                status => Err(Self::error_from(status, &url, response).await),
            }
        })
        .await
    }

    /// Create a document.
    pub async fn create_document(
        &self,
        collection: &str,
        doc_id: &str,
        fields: HashMap<String, Value>,
    ) -> FirestoreResult<Document> {
        let url = format!("{}/{}?documentId={}", self.base_url, collection, doc_id);
        let body = Document::new(fields);

        self.execute_request("create_document", collection, Some(doc_id), async {
            let response = self
                .send_authorized(|| self.http.post(&url).json(&body))
                .await?;
            match response.status() {
                StatusCode::OK | StatusCode::CREATED => Ok(response.json::<Document>().await?),
                StatusCode::CONFLICT => Err(FirestoreError::AlreadyExists(format!(
                    "{}/{}",
                    collection, doc_id
                ))),
                status => Err(Self::error_from(status, &url, response).await),
            }
        })
        .await
    }

    /// Replace a document's fields (full overwrite of the listed fields).
    pub async fn set_document(
        &self,
        collection: &str,
        doc_id: &str,
        fields: HashMap<String, Value>,
    ) -> FirestoreResult<Document> {
        let url = self.document_path(collection, doc_id);
        let body = Document::new(fields);

        self.execute_request("set_document", collection, Some(doc_id), async {
            let response = self
                .send_authorized(|| self.http.patch(&url).json(&body))
                .await?;
            match response.status() {
                StatusCode::OK => Ok(response.json::<Document>().await?),
                StatusCode::NOT_FOUND => {
                    Err(FirestoreError::not_found(format!("{}/{}", collection, doc_id)))
                }
                status => Err(Self::error_from(status, &url, response).await),
            }
        })
        .await
    }

    /// List documents in a collection.
    pub async fn list_documents(
        &self,
        collection: &str,
        page_size: Option<u32>,
        page_token: Option<&str>,
    ) -> FirestoreResult<ListDocumentsResponse> {
        let mut url = format!("{}/{}", self.base_url, collection);
        let mut params = Vec::new();
        if let Some(size) = page_size {
            params.push(format!("pageSize={}", size));
        }
        if let Some(token) = page_token {
            params.push(format!("pageToken={}", urlencoding::encode(token)));
        }
        if !params.is_empty() {
            url = format!("{}?{}", url, params.join("&"));
        }

        self.execute_request("list_documents", collection, None, async {
            let response = self.send_authorized(|| self.http.get(&url)).await?;
            match response.status() {
                StatusCode::OK => Ok(response.json::<ListDocumentsResponse>().await?),
                status => Err(Self::error_from(status, &url, response).await),
            }
        })
        .await
    }

    /// Execute a batch write (atomic multi-document operation).
    pub async fn batch_write(&self, writes: Vec<Write>) -> FirestoreResult<BatchWriteResponse> {
        if writes.is_empty() {
            return Ok(BatchWriteResponse::empty());
        }
        if writes.len() > 500 {
            return Err(FirestoreError::request_failed(
                "Batch write exceeds 500 document limit",
            ));
        }

        let url = format!("{}:batchWrite", self.base_url);
        let request = BatchWriteRequest { writes };

        self.execute_request("batch_write", "batch", None, async {
            let response = self
                .send_authorized(|| self.http.post(&url).json(&request))
                .await?;
            match response.status() {
                StatusCode::OK => {
                    let batch_response: BatchWriteResponse = response.json().await?;
                    batch_response.check_for_errors()?;
                    Ok(batch_response)
                }
                status => Err(Self::error_from(status, &url, response).await),
            }
        })
        .await
    }

    /// Execute with retry.
    pub async fn with_retry<T, F, Fut>(&self, operation: &str, op: F) -> FirestoreResult<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = FirestoreResult<T>>,
    {
        crate::retry::with_retry(&self.config.retry, operation, op).await
    }

    /// Execute a request with tracing and metrics.
    async fn execute_request<T, F>(
        &self,
        operation: &str,
        collection: &str,
        doc_id: Option<&str>,
        fut: F,
    ) -> FirestoreResult<T>
    where
        F: std::future::Future<Output = FirestoreResult<T>>,
    {
        let span = if let Some(id) = doc_id {
            info_span!("firestore_request", operation = %operation, collection = %collection, doc_id = %id)
        } else {
            info_span!("firestore_request", operation = %operation, collection = %collection)
        };

        let start = Instant::now();
        let result = fut.instrument(span).await;
        let latency_ms = start.elapsed().as_millis() as f64;

        let status = match &result {
            Ok(_) => 200,
            Err(e) => e.http_status().unwrap_or(500),
        };
        record_request(operation, status, latency_ms);

        result
    }
}
