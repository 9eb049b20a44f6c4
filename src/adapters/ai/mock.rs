//! Mock AI providers for tests.
//!
//! Both mocks answer deterministically from their inputs and can be
//! scripted to fail: queued errors are consumed one per call, then the mock
//! returns to succeeding. Call counters let tests assert how many provider
//! calls a consumer actually made.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use crate::domain::foundation::PipelineError;
use crate::ports::{
    Illustrator, ImagePayload, ImagePromptOutput, ProviderInfo, RewriteOutput, RewriteRequest,
    RewriteResult, Rewriter,
};

/// Scripted rewriter.
#[derive(Default)]
pub struct MockRewriter {
    rewrite_calls: AtomicU32,
    prompt_calls: AtomicU32,
    rewrite_failures: Mutex<VecDeque<PipelineError>>,
    prompt_failures: Mutex<VecDeque<PipelineError>>,
}

impl MockRewriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues an error for the next `rewrite` call; consumed once.
    pub fn queue_rewrite_failure(&self, error: PipelineError) {
        self.rewrite_failures
            .lock()
            .unwrap()
            .push_back(error);
    }

    /// Queues an error for the next `image_prompt` call; consumed once.
    pub fn queue_prompt_failure(&self, error: PipelineError) {
        self.prompt_failures.lock().unwrap().push_back(error);
    }

    pub fn rewrite_calls(&self) -> u32 {
        self.rewrite_calls.load(Ordering::SeqCst)
    }

    pub fn prompt_calls(&self) -> u32 {
        self.prompt_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Rewriter for MockRewriter {
    async fn rewrite(&self, request: &RewriteRequest) -> Result<RewriteOutput, PipelineError> {
        self.rewrite_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(error) = self.rewrite_failures.lock().unwrap().pop_front() {
            return Err(error);
        }

        let result = RewriteResult {
            title: "Rewritten headline".to_string(),
            excerpt: "A concise mock summary of the story.".to_string(),
            body_html: format!("<p>{}</p>", request.source_text),
            tags: vec!["mock".to_string(), "news".to_string()],
            warnings: Vec::new(),
        };

        Ok(RewriteOutput {
            result,
            prompt: format!("rewrite:{}", request.source_text),
        })
    }

    async fn image_prompt(
        &self,
        title: &str,
        _excerpt: &str,
    ) -> Result<ImagePromptOutput, PipelineError> {
        self.prompt_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(error) = self.prompt_failures.lock().unwrap().pop_front() {
            return Err(error);
        }

        Ok(ImagePromptOutput {
            prompt: format!("An editorial illustration of: {title}"),
            request_prompt: format!("prompt:{title}"),
        })
    }

    fn info(&self) -> ProviderInfo {
        ProviderInfo::new("mock", "mock-rewriter-1")
    }
}

/// Scripted illustrator.
#[derive(Default)]
pub struct MockIllustrator {
    image_calls: AtomicU32,
    card_calls: AtomicU32,
    image_failures: Mutex<VecDeque<PipelineError>>,
    card_failures: Mutex<VecDeque<PipelineError>>,
}

impl MockIllustrator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues an error for the next `generate_image` call; consumed once.
    pub fn queue_image_failure(&self, error: PipelineError) {
        self.image_failures.lock().unwrap().push_back(error);
    }

    /// Queues an error for the next `generate_social_card` call.
    pub fn queue_card_failure(&self, error: PipelineError) {
        self.card_failures.lock().unwrap().push_back(error);
    }

    pub fn image_calls(&self) -> u32 {
        self.image_calls.load(Ordering::SeqCst)
    }

    pub fn card_calls(&self) -> u32 {
        self.card_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Illustrator for MockIllustrator {
    async fn generate_image(&self, prompt: &str) -> Result<ImagePayload, PipelineError> {
        self.image_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(error) = self.image_failures.lock().unwrap().pop_front() {
            return Err(error);
        }

        Ok(ImagePayload::new(
            format!("image:{prompt}").into_bytes(),
            "image/png",
        ))
    }

    async fn generate_social_card(
        &self,
        title: &str,
        excerpt: &str,
        image_url: &str,
    ) -> Result<ImagePayload, PipelineError> {
        self.card_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(error) = self.card_failures.lock().unwrap().pop_front() {
            return Err(error);
        }

        Ok(ImagePayload::new(
            format!("card:{title}:{excerpt}:{image_url}").into_bytes(),
            "image/png",
        ))
    }

    fn info(&self) -> ProviderInfo {
        ProviderInfo::new("mock", "mock-illustrator-1")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> RewriteRequest {
        RewriteRequest {
            source_text: "Raw body.".into(),
            source_name: "Agency".into(),
            source_url: "https://example.com".into(),
        }
    }

    #[tokio::test]
    async fn rewrite_succeeds_by_default() {
        let rewriter = MockRewriter::new();
        let output = rewriter.rewrite(&request()).await.unwrap();

        assert_eq!(output.result.title, "Rewritten headline");
        assert!(output.result.body_html.contains("Raw body."));
        assert_eq!(rewriter.rewrite_calls(), 1);
    }

    #[tokio::test]
    async fn queued_failure_is_consumed_once() {
        let rewriter = MockRewriter::new();
        rewriter.queue_rewrite_failure(PipelineError::transient("boom"));

        assert!(rewriter.rewrite(&request()).await.is_err());
        assert!(rewriter.rewrite(&request()).await.is_ok());
        assert_eq!(rewriter.rewrite_calls(), 2);
    }

    #[tokio::test]
    async fn illustrator_payload_is_deterministic() {
        let illustrator = MockIllustrator::new();
        let a = illustrator.generate_image("skyline").await.unwrap();
        let b = illustrator.generate_image("skyline").await.unwrap();

        assert_eq!(a, b);
        assert_eq!(a.content_type, "image/png");
        assert_eq!(illustrator.image_calls(), 2);
    }

    #[tokio::test]
    async fn card_failure_queue_works() {
        let illustrator = MockIllustrator::new();
        illustrator.queue_card_failure(PipelineError::permanent("filtered"));

        let err = illustrator
            .generate_social_card("T", "E", "http://img")
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::ProviderPermanent { .. }));
        assert_eq!(illustrator.card_calls(), 1);
    }
}
