//! Blob storage configuration

use serde::Deserialize;
use std::time::Duration;

use crate::adapters::blob::HttpBlobStoreConfig;

use super::error::ValidationError;

/// Blob storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// S3-compatible gateway endpoint (e.g. http://minio:9000)
    pub endpoint: String,

    /// Bucket generated media is written into
    #[serde(default = "default_bucket")]
    pub bucket: String,

    /// Public base URL objects are served from
    pub public_base_url: String,

    /// Upload timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl StorageConfig {
    pub fn blob_store_config(&self) -> HttpBlobStoreConfig {
        HttpBlobStoreConfig::new(&self.endpoint, &self.bucket, &self.public_base_url)
            .with_timeout(Duration::from_secs(self.timeout_secs))
    }

    /// Validate storage configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.endpoint.starts_with("http://") && !self.endpoint.starts_with("https://") {
            return Err(ValidationError::InvalidStorageEndpoint);
        }
        if !self.public_base_url.starts_with("http://")
            && !self.public_base_url.starts_with("https://")
        {
            return Err(ValidationError::InvalidStorageEndpoint);
        }
        if self.bucket.trim().is_empty() {
            return Err(ValidationError::MissingStorageBucket);
        }
        Ok(())
    }
}

fn default_bucket() -> String {
    "newsportal-media".to_string()
}

fn default_timeout() -> u64 {
    30
}
