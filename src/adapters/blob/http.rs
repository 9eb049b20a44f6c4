//! HTTP blob store - uploads objects to an S3-compatible gateway.
//!
//! Objects are written with `PUT {endpoint}/{bucket}/{key}` and served from
//! `{public_base_url}/{key}`. Keys are content-addressed, so re-uploading
//! the same bytes overwrites an identical object and the returned URL is
//! stable across retries.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use crate::domain::foundation::PipelineError;
use crate::ports::{object_key, BlobStore};

/// Configuration for the HTTP blob store.
#[derive(Debug, Clone)]
pub struct HttpBlobStoreConfig {
    /// Gateway endpoint (e.g. http://minio:9000).
    pub endpoint: String,
    /// Bucket objects are written into.
    pub bucket: String,
    /// Public base URL returned to callers (e.g. a CDN domain).
    pub public_base_url: String,
    /// Upload timeout.
    pub timeout: Duration,
}

impl HttpBlobStoreConfig {
    pub fn new(
        endpoint: impl Into<String>,
        bucket: impl Into<String>,
        public_base_url: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            bucket: bucket.into(),
            public_base_url: public_base_url.into(),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

pub struct HttpBlobStore {
    config: HttpBlobStoreConfig,
    client: Client,
}

impl HttpBlobStore {
    pub fn new(config: HttpBlobStoreConfig) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self { config, client }
    }

    fn object_url(&self, key: &str) -> String {
        format!(
            "{}/{}/{}",
            self.config.endpoint.trim_end_matches('/'),
            self.config.bucket,
            key
        )
    }

    fn public_url(&self, key: &str) -> String {
        format!(
            "{}/{}",
            self.config.public_base_url.trim_end_matches('/'),
            key
        )
    }

    fn extension_for(content_type: &str) -> &'static str {
        match content_type {
            "image/png" => "png",
            "image/webp" => "webp",
            _ => "jpg",
        }
    }
}

#[async_trait]
impl BlobStore for HttpBlobStore {
    async fn store(
        &self,
        bytes: &[u8],
        content_type: &str,
        key_hint: &str,
    ) -> Result<String, PipelineError> {
        let key = object_key(bytes, key_hint, Self::extension_for(content_type));

        let response = self
            .client
            .put(self.object_url(&key))
            .header("Content-Type", content_type)
            .body(bytes.to_vec())
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    PipelineError::transient("blob store: upload timed out")
                } else {
                    PipelineError::transient(format!("blob store: upload failed: {e}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PipelineError::transient(format!(
                "blob store: upload rejected ({status}): {body:.200}"
            )));
        }

        Ok(self.public_url(&key))
    }
}
