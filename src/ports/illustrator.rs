//! Illustrator port - image generation capability.
//!
//! Providers may answer with raw bytes or a fetchable URL; adapters resolve
//! either into `ImagePayload` bytes so consumers have a single shape to
//! hand the blob store.

use async_trait::async_trait;

use crate::domain::foundation::PipelineError;

use super::rewriter::ProviderInfo;

/// Raw image bytes plus their media type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

impl ImagePayload {
    pub fn new(bytes: Vec<u8>, content_type: impl Into<String>) -> Self {
        Self {
            bytes,
            content_type: content_type.into(),
        }
    }

    /// File extension for the payload's media type, for blob keys.
    pub fn extension(&self) -> &'static str {
        match self.content_type.as_str() {
            "image/png" => "png",
            "image/webp" => "webp",
            _ => "jpg",
        }
    }
}

/// Port for image-generation providers.
#[async_trait]
pub trait Illustrator: Send + Sync {
    /// Generates the article's hero illustration from a text prompt.
    async fn generate_image(&self, prompt: &str) -> Result<ImagePayload, PipelineError>;

    /// Composes a social-sharing card from the rewritten copy and the hero
    /// image. The caller stores the bytes through the blob store and
    /// records the resulting URL on the aggregate.
    async fn generate_social_card(
        &self,
        title: &str,
        excerpt: &str,
        image_url: &str,
    ) -> Result<ImagePayload, PipelineError>;

    /// Provider identity for logging and audit.
    fn info(&self) -> ProviderInfo;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(dead_code)]
    fn assert_object_safe(_: &dyn Illustrator) {}

    #[test]
    fn extension_follows_content_type() {
        assert_eq!(ImagePayload::new(vec![], "image/png").extension(), "png");
        assert_eq!(ImagePayload::new(vec![], "image/webp").extension(), "webp");
        assert_eq!(ImagePayload::new(vec![], "image/jpeg").extension(), "jpg");
    }
}
