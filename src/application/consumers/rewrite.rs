//! REWRITE stage: raw body -> publishable copy via the configured LLM.

use async_trait::async_trait;
use serde_json::{json, Value as JsonValue};
use std::sync::Arc;

use crate::domain::article::Article;
use crate::domain::audit::ProviderMeta;
use crate::domain::foundation::PipelineError;
use crate::domain::job::Stage;
use crate::ports::{RewriteRequest, Rewriter};

use super::{StageArtifacts, StageHandler};

pub struct RewriteHandler {
    rewriter: Arc<dyn Rewriter>,
}

impl RewriteHandler {
    pub fn new(rewriter: Arc<dyn Rewriter>) -> Self {
        Self { rewriter }
    }
}

#[async_trait]
impl StageHandler for RewriteHandler {
    fn stage(&self) -> Stage {
        Stage::Rewrite
    }

    fn input_snapshot(&self, article: &Article) -> JsonValue {
        json!({
            "raw_body": article.raw_body,
            "source_author": article.source_author,
            "source_url": article.source_url,
        })
    }

    async fn transform(&self, mut article: Article) -> Result<StageArtifacts, PipelineError> {
        let request = RewriteRequest {
            source_text: article.raw_body.clone(),
            source_name: article.source_author.clone(),
            source_url: article.source_url.clone(),
        };

        let output = self.rewriter.rewrite(&request).await?;
        let result = output.result;

        article.apply_rewrite(
            result.title.clone(),
            result.excerpt.clone(),
            result.body_html.clone(),
            result.tags.iter().cloned(),
        )?;

        let info = self.rewriter.info();
        Ok(StageArtifacts {
            article,
            output_snapshot: serde_json::to_value(&result)
                .unwrap_or_else(|_| json!({"title": result.title})),
            provider: ProviderMeta::new(info.name, info.model),
            prompt_text: Some(output.prompt),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ai::MockRewriter;
    use crate::domain::article::PipelineState;
    use crate::domain::foundation::ArticleId;

    fn ingested() -> Article {
        Article::ingested(ArticleId::new(1), "raw body", "Wire", "https://src/a")
    }

    #[tokio::test]
    async fn transform_advances_to_rewritten() {
        let rewriter = Arc::new(MockRewriter::new());
        let handler = RewriteHandler::new(rewriter.clone());

        let artifacts = handler.transform(ingested()).await.unwrap();

        assert_eq!(artifacts.article.pipeline_state, PipelineState::Rewritten);
        assert_eq!(
            artifacts.article.title.as_deref(),
            Some("Rewritten headline")
        );
        assert_eq!(artifacts.output_snapshot["title"], "Rewritten headline");
        assert_eq!(artifacts.provider.provider_name, "mock");
        assert!(artifacts.prompt_text.is_some());
        assert_eq!(rewriter.rewrite_calls(), 1);
    }

    #[tokio::test]
    async fn provider_error_propagates() {
        let rewriter = Arc::new(MockRewriter::new());
        rewriter.queue_rewrite_failure(PipelineError::transient("rate limited"));
        let handler = RewriteHandler::new(rewriter);

        let err = handler.transform(ingested()).await.unwrap_err();
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn wrong_state_yields_validation_error() {
        let rewriter = Arc::new(MockRewriter::new());
        let handler = RewriteHandler::new(rewriter);

        let mut article = ingested();
        article
            .apply_rewrite("T", "E", "<p>B</p>", vec![])
            .unwrap();

        let err = handler.transform(article).await.unwrap_err();
        assert!(matches!(err, PipelineError::Validation(_)));
    }

    #[test]
    fn input_snapshot_captures_source_fields() {
        let handler = RewriteHandler::new(Arc::new(MockRewriter::new()));
        let snapshot = handler.input_snapshot(&ingested());

        assert_eq!(snapshot["raw_body"], "raw body");
        assert_eq!(snapshot["source_author"], "Wire");
    }
}
