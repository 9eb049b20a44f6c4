//! In-memory content store for tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use tokio::sync::Mutex;

use crate::domain::article::Article;
use crate::domain::foundation::{ArticleId, PipelineError};
use crate::ports::ContentStore;

/// Map-backed store enforcing the compare-and-swap contract: a save only
/// commits when the caller's expected version matches the stored one, and
/// every commit bumps the version by one.
#[derive(Default)]
pub struct InMemoryContentStore {
    articles: Mutex<HashMap<ArticleId, Article>>,
    save_attempts: AtomicU32,
    save_commits: AtomicU32,
}

impl InMemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds an article, as the ingestion path would.
    pub async fn insert(&self, article: Article) {
        self.articles.lock().await.insert(article.id, article);
    }

    pub async fn current(&self, id: ArticleId) -> Option<Article> {
        self.articles.lock().await.get(&id).cloned()
    }

    pub fn save_attempts(&self) -> u32 {
        self.save_attempts.load(Ordering::SeqCst)
    }

    pub fn save_commits(&self) -> u32 {
        self.save_commits.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentStore for InMemoryContentStore {
    async fn get(&self, id: ArticleId) -> Result<Article, PipelineError> {
        self.articles
            .lock()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| PipelineError::not_found(id.value()))
    }

    async fn save(&self, article: Article, expected_version: u64) -> Result<Article, PipelineError> {
        self.save_attempts.fetch_add(1, Ordering::SeqCst);

        let mut articles = self.articles.lock().await;
        let stored = articles
            .get(&article.id)
            .ok_or_else(|| PipelineError::not_found(article.id.value()))?;

        if stored.version != expected_version {
            return Err(PipelineError::version_conflict(
                article.id.value(),
                expected_version,
                stored.version,
            ));
        }

        let mut committed = article;
        committed.version = expected_version + 1;
        articles.insert(committed.id, committed.clone());

        self.save_commits.fetch_add(1, Ordering::SeqCst);
        Ok(committed)
    }
}
