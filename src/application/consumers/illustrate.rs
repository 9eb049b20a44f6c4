//! ILLUSTRATE stage: derive an image prompt from the rewritten copy, render
//! the hero illustration, and re-host it in the blob store.
//!
//! The prompt derivation is an LLM call in its own right and gets its own
//! audit record, written as soon as it succeeds. If the image generation
//! that follows fails and is retried, a new prompt record accompanies each
//! retry; the trail shows every provider call that was actually made.

use async_trait::async_trait;
use serde_json::{json, Value as JsonValue};
use std::sync::Arc;
use tracing::error;

use crate::domain::article::Article;
use crate::domain::audit::{AuditRecord, ProviderMeta};
use crate::domain::foundation::{PipelineError, ValidationError};
use crate::domain::job::Stage;
use crate::ports::{AuditLog, BlobStore, Illustrator, Rewriter};

use super::{key_hint, StageArtifacts, StageHandler};

pub struct IllustrateHandler {
    rewriter: Arc<dyn Rewriter>,
    illustrator: Arc<dyn Illustrator>,
    blob_store: Arc<dyn BlobStore>,
    audit: Arc<dyn AuditLog>,
}

impl IllustrateHandler {
    pub fn new(
        rewriter: Arc<dyn Rewriter>,
        illustrator: Arc<dyn Illustrator>,
        blob_store: Arc<dyn BlobStore>,
        audit: Arc<dyn AuditLog>,
    ) -> Self {
        Self {
            rewriter,
            illustrator,
            blob_store,
            audit,
        }
    }
}

#[async_trait]
impl StageHandler for IllustrateHandler {
    fn stage(&self) -> Stage {
        Stage::Illustrate
    }

    fn input_snapshot(&self, article: &Article) -> JsonValue {
        json!({
            "title": article.title,
            "excerpt": article.excerpt,
        })
    }

    async fn transform(&self, mut article: Article) -> Result<StageArtifacts, PipelineError> {
        let title = article
            .title
            .clone()
            .ok_or_else(|| ValidationError::empty_field("title"))?;
        let excerpt = article.excerpt.clone().unwrap_or_default();

        let prompt_output = self.rewriter.image_prompt(&title, &excerpt).await?;

        let rewriter_info = self.rewriter.info();
        let prompt_record = AuditRecord::success(
            article.id,
            Stage::Illustrate,
            json!({"title": title, "excerpt": excerpt}),
            json!({"prompt": prompt_output.prompt}),
            ProviderMeta::new(rewriter_info.name, rewriter_info.model),
        )
        .with_prompt(prompt_output.request_prompt.clone());
        if let Err(e) = self.audit.record(prompt_record).await {
            error!(article_id = %article.id, error = %e, "failed to record prompt audit entry");
        }

        let payload = self.illustrator.generate_image(&prompt_output.prompt).await?;
        let image_url = self
            .blob_store
            .store(
                &payload.bytes,
                &payload.content_type,
                &key_hint(&article, Stage::Illustrate),
            )
            .await?;

        article.apply_illustration(image_url.clone())?;

        let info = self.illustrator.info();
        Ok(StageArtifacts {
            article,
            output_snapshot: json!({
                "prompt": prompt_output.prompt,
                "image_url": image_url,
            }),
            provider: ProviderMeta::new(info.name, info.model),
            prompt_text: Some(prompt_output.prompt),
        })
    }
}
