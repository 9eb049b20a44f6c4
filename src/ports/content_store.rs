//! ContentStore port - the load/compare-and-swap-save contract over the
//! external article store.
//!
//! The persistent storage engine is an external collaborator; the pipeline
//! only ever talks to it through this narrow contract. Consumers never
//! blind-write: they load an article with its `version`, recompute, and save
//! with a compare-and-swap on that version.

use async_trait::async_trait;

use crate::domain::article::Article;
use crate::domain::foundation::{ArticleId, PipelineError};

/// Port for loading and optimistically saving article aggregates.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Loads an article by id.
    ///
    /// # Errors
    ///
    /// `PipelineError::NotFound` if no article exists with the id.
    async fn get(&self, id: ArticleId) -> Result<Article, PipelineError>;

    /// Saves an article if its stored version still equals
    /// `expected_version`, and returns the stored copy with the version
    /// bumped.
    ///
    /// # Errors
    ///
    /// `PipelineError::VersionConflict` if a concurrent writer advanced the
    /// version first. The caller retries from the top: reload, recheck the
    /// stage precondition, recompute.
    async fn save(&self, article: Article, expected_version: u64) -> Result<Article, PipelineError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(dead_code)]
    fn assert_object_safe(_: &dyn ContentStore) {}
}
