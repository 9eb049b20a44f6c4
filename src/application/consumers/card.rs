//! CARD stage: compose the social-sharing card and re-host it.

use async_trait::async_trait;
use serde_json::{json, Value as JsonValue};
use std::sync::Arc;

use crate::domain::article::Article;
use crate::domain::audit::ProviderMeta;
use crate::domain::foundation::{PipelineError, ValidationError};
use crate::domain::job::Stage;
use crate::ports::{BlobStore, Illustrator};

use super::{key_hint, StageArtifacts, StageHandler};

pub struct CardHandler {
    illustrator: Arc<dyn Illustrator>,
    blob_store: Arc<dyn BlobStore>,
}

impl CardHandler {
    pub fn new(illustrator: Arc<dyn Illustrator>, blob_store: Arc<dyn BlobStore>) -> Self {
        Self {
            illustrator,
            blob_store,
        }
    }
}

#[async_trait]
impl StageHandler for CardHandler {
    fn stage(&self) -> Stage {
        Stage::Card
    }

    fn input_snapshot(&self, article: &Article) -> JsonValue {
        json!({
            "title": article.title,
            "excerpt": article.excerpt,
            "primary_image_url": article.primary_image_url,
        })
    }

    async fn transform(&self, mut article: Article) -> Result<StageArtifacts, PipelineError> {
        let title = article
            .title
            .clone()
            .ok_or_else(|| ValidationError::empty_field("title"))?;
        let excerpt = article.excerpt.clone().unwrap_or_default();
        let image_url = article
            .primary_image_url
            .clone()
            .ok_or_else(|| ValidationError::empty_field("primary_image_url"))?;

        let payload = self
            .illustrator
            .generate_social_card(&title, &excerpt, &image_url)
            .await?;

        let card_url = self
            .blob_store
            .store(
                &payload.bytes,
                &payload.content_type,
                &key_hint(&article, Stage::Card),
            )
            .await?;

        article.apply_social_card(card_url.clone())?;

        let info = self.illustrator.info();
        Ok(StageArtifacts {
            article,
            output_snapshot: json!({"card_url": card_url}),
            provider: ProviderMeta::new(info.name, info.model),
            prompt_text: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ai::MockIllustrator;
    use crate::adapters::blob::InMemoryBlobStore;
    use crate::domain::article::PipelineState;
    use crate::domain::foundation::ArticleId;

    fn illustrated() -> Article {
        let mut article = Article::ingested(ArticleId::new(4), "raw", "Wire", "https://src/a");
        article
            .apply_rewrite("A headline", "An excerpt", "<p>B</p>", vec![])
            .unwrap();
        article
            .apply_illustration("https://media.test/news/4/illustrate/abc.png")
            .unwrap();
        article
    }

    #[tokio::test]
    async fn transform_completes_the_pipeline() {
        let illustrator = Arc::new(MockIllustrator::new());
        let blob_store = Arc::new(InMemoryBlobStore::default());
        let handler = CardHandler::new(illustrator.clone(), blob_store.clone());

        let artifacts = handler.transform(illustrated()).await.unwrap();

        assert_eq!(artifacts.article.pipeline_state, PipelineState::Carded);
        let url = artifacts.article.social_card_url.clone().unwrap();
        assert!(blob_store.contains_url(&url).await);
        assert_eq!(artifacts.output_snapshot["card_url"], url);
        assert_eq!(illustrator.card_calls(), 1);
    }

    #[tokio::test]
    async fn missing_image_is_a_validation_error() {
        let illustrator = Arc::new(MockIllustrator::new());
        let blob_store = Arc::new(InMemoryBlobStore::default());
        let handler = CardHandler::new(illustrator.clone(), blob_store);

        let mut article = Article::ingested(ArticleId::new(5), "raw", "W", "https://s");
        article
            .apply_rewrite("T", "E", "<p>B</p>", vec![])
            .unwrap();

        let err = handler.transform(article).await.unwrap_err();
        assert!(matches!(err, PipelineError::Validation(_)));
        assert_eq!(illustrator.card_calls(), 0);
    }

    #[tokio::test]
    async fn provider_failure_leaves_article_unsaved() {
        let illustrator = Arc::new(MockIllustrator::new());
        illustrator.queue_card_failure(PipelineError::transient("overloaded"));
        let blob_store = Arc::new(InMemoryBlobStore::default());
        let handler = CardHandler::new(illustrator, blob_store.clone());

        let err = handler.transform(illustrated()).await.unwrap_err();
        assert!(err.is_transient());
        assert_eq!(blob_store.object_count().await, 0);
    }
}
