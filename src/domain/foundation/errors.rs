//! Error types for the pipeline domain.

use thiserror::Error;

use crate::domain::job::Stage;

/// Errors that occur during value object construction or aggregate mutation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Field '{field}' cannot be empty")]
    EmptyField { field: String },

    #[error("Field '{field}' exceeds {max} characters (got {actual})")]
    TooLong {
        field: String,
        max: usize,
        actual: usize,
    },

    #[error("Field '{field}' has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    #[error("Cannot transition pipeline state from {from} to {to}")]
    InvalidTransition { from: String, to: String },
}

impl ValidationError {
    /// Creates an empty field validation error.
    pub fn empty_field(field: impl Into<String>) -> Self {
        ValidationError::EmptyField {
            field: field.into(),
        }
    }

    /// Creates a length violation error.
    pub fn too_long(field: impl Into<String>, max: usize, actual: usize) -> Self {
        ValidationError::TooLong {
            field: field.into(),
            max,
            actual,
        }
    }

    /// Creates an invalid format validation error.
    pub fn invalid_format(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError::InvalidFormat {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Pipeline error taxonomy.
///
/// The variant decides how a stage consumer disposes of the message that
/// triggered the error:
///
/// | Variant | Disposition |
/// |---|---|
/// | `NotFound` | dead-letter immediately, no store write |
/// | `VersionConflict` | transient - requeue and retry from the top |
/// | `ProviderTransient` | transient - requeue with backoff |
/// | `ProviderPermanent` | dead-letter immediately, aggregate -> FAILED |
/// | `BrokerUnavailable` | surfaced to the publisher's caller, never dropped |
/// | `Validation` | permanent - the aggregate or provider output is malformed |
#[derive(Debug, Clone, Error)]
pub enum PipelineError {
    /// Referenced article does not exist in the content store.
    #[error("article {article_id} not found")]
    NotFound { article_id: i64 },

    /// Optimistic save lost a race with a concurrent writer.
    #[error("version conflict on article {article_id}: expected {expected}, store has {actual}")]
    VersionConflict {
        article_id: i64,
        expected: u64,
        actual: u64,
    },

    /// Timeout, rate limit, 5xx or connection failure from an external
    /// service. Safe to retry.
    #[error("transient provider failure: {message}")]
    ProviderTransient { message: String },

    /// Malformed or policy-rejected provider output. Retrying would mask a
    /// bug, so this dead-letters on the first attempt.
    #[error("permanent provider failure: {message}")]
    ProviderPermanent { message: String },

    /// The broker refused a publish. The caller of the job publisher must
    /// retry or escalate; this is never silently dropped.
    #[error("broker unavailable: {message}")]
    BrokerUnavailable { message: String },

    /// Domain validation failure while applying a stage result.
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl PipelineError {
    /// Creates a not-found error for an article id.
    pub fn not_found(article_id: i64) -> Self {
        PipelineError::NotFound { article_id }
    }

    /// Creates a version conflict error.
    pub fn version_conflict(article_id: i64, expected: u64, actual: u64) -> Self {
        PipelineError::VersionConflict {
            article_id,
            expected,
            actual,
        }
    }

    /// Creates a transient provider error.
    pub fn transient(message: impl Into<String>) -> Self {
        PipelineError::ProviderTransient {
            message: message.into(),
        }
    }

    /// Creates a permanent provider error.
    pub fn permanent(message: impl Into<String>) -> Self {
        PipelineError::ProviderPermanent {
            message: message.into(),
        }
    }

    /// Creates a broker unavailable error.
    pub fn broker_unavailable(message: impl Into<String>) -> Self {
        PipelineError::BrokerUnavailable {
            message: message.into(),
        }
    }

    /// Returns true if the retry ladder may resolve this error.
    ///
    /// `BrokerUnavailable` counts as transient from a consumer's point of
    /// view: the next-stage publish can succeed on redelivery.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PipelineError::VersionConflict { .. }
                | PipelineError::ProviderTransient { .. }
                | PipelineError::BrokerUnavailable { .. }
        )
    }

    /// Classifies this error for the stage consumer's retry ladder.
    pub fn failure_kind(&self) -> FailureKind {
        if self.is_transient() {
            FailureKind::Transient
        } else {
            FailureKind::Permanent
        }
    }
}

/// How a stage consumer disposes of a delivery after an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Requeue with backoff, consuming retry budget.
    Transient,
    /// Dead-letter without consuming retry budget.
    Permanent,
}

/// Formats a dead-letter reason that names the failing stage.
pub fn dead_letter_reason(stage: Stage, error: &PipelineError) -> String {
    format!("{}: {}", stage, error)
}
