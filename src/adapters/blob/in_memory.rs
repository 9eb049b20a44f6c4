//! In-memory blob store for tests.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;

use crate::domain::foundation::PipelineError;
use crate::ports::{object_key, BlobStore};

#[derive(Debug, Clone)]
struct StoredObject {
    bytes: Vec<u8>,
    content_type: String,
}

/// Keeps objects in a map keyed the same way the HTTP adapter keys them,
/// so storing identical bytes twice lands on one object.
pub struct InMemoryBlobStore {
    base_url: String,
    objects: Mutex<HashMap<String, StoredObject>>,
}

impl Default for InMemoryBlobStore {
    fn default() -> Self {
        Self::new("https://media.test")
    }
}

impl InMemoryBlobStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            objects: Mutex::new(HashMap::new()),
        }
    }

    pub async fn object_count(&self) -> usize {
        self.objects.lock().await.len()
    }

    pub async fn contains_url(&self, url: &str) -> bool {
        let Some(key) = url.strip_prefix(&format!("{}/", self.base_url)) else {
            return false;
        };
        self.objects.lock().await.contains_key(key)
    }

    /// Returns the stored bytes and media type for a URL this store issued.
    pub async fn object_for_url(&self, url: &str) -> Option<(Vec<u8>, String)> {
        let key = url.strip_prefix(&format!("{}/", self.base_url))?;
        self.objects
            .lock()
            .await
            .get(key)
            .map(|o| (o.bytes.clone(), o.content_type.clone()))
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
impl BlobStore for InMemoryBlobStore {
    async fn store(
        &self,
        bytes: &[u8],
        content_type: &str,
        key_hint: &str,
    ) -> Result<String, PipelineError> {
        let key = object_key(bytes, key_hint, Self::extension_for(content_type));
        self.objects.lock().await.insert(
            key.clone(),
            StoredObject {
                bytes: bytes.to_vec(),
                content_type: content_type.to_string(),
            },
        );
        Ok(format!("{}/{}", self.base_url, key))
    }
}
