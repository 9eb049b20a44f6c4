//! AuditLog port - write-only append of transformation attempts.

use async_trait::async_trait;

use crate::domain::audit::AuditRecord;
use crate::domain::foundation::PipelineError;

/// Port for the append-only audit trail.
///
/// Consumers call `record` for every attempt, success or failure, before
/// acknowledging or rejecting the message. A failure to record must never
/// fail the calling stage, but callers report it (tracing::error) rather
/// than swallowing it.
#[async_trait]
pub trait AuditLog: Send + Sync {
    /// Appends one record. Records are never mutated or deleted.
    async fn record(&self, record: AuditRecord) -> Result<(), PipelineError>;
}
