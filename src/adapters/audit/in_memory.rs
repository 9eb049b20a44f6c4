//! In-memory audit log for tests.

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::audit::AuditRecord;
use crate::domain::foundation::{ArticleId, PipelineError};
use crate::ports::AuditLog;

/// Append-only vector of audit records.
#[derive(Default)]
pub struct InMemoryAuditLog {
    records: Mutex<Vec<AuditRecord>>,
}

impl InMemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn count(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn all(&self) -> Vec<AuditRecord> {
        self.records.lock().await.clone()
    }

    /// Records for one article, in insertion order.
    pub async fn records_for(&self, article_id: ArticleId) -> Vec<AuditRecord> {
        self.records
            .lock()
            .await
            .iter()
            .filter(|r| r.entity_id == article_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl AuditLog for InMemoryAuditLog {
    async fn record(&self, record: AuditRecord) -> Result<(), PipelineError> {
        self.records.lock().await.push(record);
        Ok(())
    }
}
