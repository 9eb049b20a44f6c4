//! Stage handlers - the per-stage transformation logic the generic
//! consumer runner drives.

mod card;
mod illustrate;
mod rewrite;

pub use card::CardHandler;
pub use illustrate::IllustrateHandler;
pub use rewrite::RewriteHandler;

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use crate::domain::article::Article;
use crate::domain::audit::ProviderMeta;
use crate::domain::foundation::PipelineError;
use crate::domain::job::Stage;

/// Everything a successful stage run produces: the advanced aggregate plus
/// the material the runner records in the audit trail.
#[derive(Debug)]
pub struct StageArtifacts {
    /// The aggregate with the stage's `apply_*` mutation performed.
    pub article: Article,
    pub output_snapshot: JsonValue,
    pub provider: ProviderMeta,
    pub prompt_text: Option<String>,
}

/// One stage's transformation, independent of messaging concerns.
///
/// The runner guarantees `transform` only runs when the aggregate is in the
/// stage's expected state; handlers still return `Validation` errors rather
/// than panicking when an invariant does not hold.
#[async_trait]
pub trait StageHandler: Send + Sync {
    fn stage(&self) -> Stage;

    /// Audit snapshot of the inputs this stage consumes, taken before the
    /// transformation so failure records capture them too.
    fn input_snapshot(&self, article: &Article) -> JsonValue;

    /// Runs the stage against a working copy of the aggregate.
    async fn transform(&self, article: Article) -> Result<StageArtifacts, PipelineError>;
}

/// Blob key hint for a stage's media output.
pub(crate) fn key_hint(article: &Article, stage: Stage) -> String {
    format!("news/{}/{}", article.id, stage.slug())
}
