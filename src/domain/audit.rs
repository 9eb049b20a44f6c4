//! Append-only audit records for transformation attempts.
//!
//! One record is written per stage attempt, success or failure, before the
//! message is acknowledged or rejected, so the audit trail stays causally
//! ordered with respect to message disposition.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::foundation::{ArticleId, Timestamp};
use super::job::Stage;

/// Whether a transformation attempt succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditOutcome {
    Success,
    Failure,
}

/// Provider identity attached to audit records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderMeta {
    pub provider_name: String,
    pub model_id: String,
}

impl ProviderMeta {
    pub fn new(provider_name: impl Into<String>, model_id: impl Into<String>) -> Self {
        Self {
            provider_name: provider_name.into(),
            model_id: model_id.into(),
        }
    }
}

/// One audit trail entry. Never mutated or deleted once recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub entity_id: ArticleId,
    pub stage: Stage,
    pub outcome: AuditOutcome,
    pub input_snapshot: JsonValue,
    pub output_snapshot: Option<JsonValue>,
    pub error_detail: Option<String>,
    pub provider: Option<ProviderMeta>,
    pub prompt_text: Option<String>,
    pub recorded_at: Timestamp,
}

impl AuditRecord {
    /// Creates a success record.
    pub fn success(
        entity_id: ArticleId,
        stage: Stage,
        input_snapshot: JsonValue,
        output_snapshot: JsonValue,
        provider: ProviderMeta,
    ) -> Self {
        Self {
            entity_id,
            stage,
            outcome: AuditOutcome::Success,
            input_snapshot,
            output_snapshot: Some(output_snapshot),
            error_detail: None,
            provider: Some(provider),
            prompt_text: None,
            recorded_at: Timestamp::now(),
        }
    }

    /// Creates a failure record.
    pub fn failure(
        entity_id: ArticleId,
        stage: Stage,
        input_snapshot: JsonValue,
        error_detail: impl Into<String>,
    ) -> Self {
        Self {
            entity_id,
            stage,
            outcome: AuditOutcome::Failure,
            input_snapshot,
            output_snapshot: None,
            error_detail: Some(error_detail.into()),
            provider: None,
            prompt_text: None,
            recorded_at: Timestamp::now(),
        }
    }

    /// Attaches the prompt that produced the recorded output.
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt_text = Some(prompt.into());
        self
    }

    /// Attaches provider identity (useful on failure records).
    pub fn with_provider(mut self, provider: ProviderMeta) -> Self {
        self.provider = Some(provider);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn success_record_carries_output_and_provider() {
        let record = AuditRecord::success(
            ArticleId::new(1),
            Stage::Rewrite,
            json!({"source": "raw"}),
            json!({"title": "T"}),
            ProviderMeta::new("openai", "gpt-4-turbo-preview"),
        )
        .with_prompt("the prompt");

        assert_eq!(record.outcome, AuditOutcome::Success);
        assert_eq!(record.output_snapshot.unwrap()["title"], "T");
        assert_eq!(record.provider.unwrap().provider_name, "openai");
        assert_eq!(record.prompt_text.as_deref(), Some("the prompt"));
        assert!(record.error_detail.is_none());
    }

    #[test]
    fn failure_record_carries_error_detail() {
        let record = AuditRecord::failure(
            ArticleId::new(2),
            Stage::Illustrate,
            json!({"prompt": "p"}),
            "provider timed out",
        );

        assert_eq!(record.outcome, AuditOutcome::Failure);
        assert_eq!(record.error_detail.as_deref(), Some("provider timed out"));
        assert!(record.output_snapshot.is_none());
    }

    #[test]
    fn outcome_serializes_screaming_snake_case() {
        assert_eq!(
            serde_json::to_string(&AuditOutcome::Success).unwrap(),
            "\"SUCCESS\""
        );
        assert_eq!(
            serde_json::to_string(&AuditOutcome::Failure).unwrap(),
            "\"FAILURE\""
        );
    }
}
