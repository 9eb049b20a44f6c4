//! Rewriter port - text transformation capability.
//!
//! Abstracts the LLM providers that rewrite a raw news item into
//! publishable copy and derive illustration prompts from it. The concrete
//! provider is selected by configuration at process start, never per
//! request.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{PipelineError, ValidationError};

/// Maximum title length accepted from a provider.
pub const MAX_TITLE_CHARS: usize = 80;
/// Maximum excerpt length accepted from a provider.
pub const MAX_EXCERPT_CHARS: usize = 160;

/// Provider identity (name + model) for logging and audit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderInfo {
    pub name: String,
    pub model: String,
}

impl ProviderInfo {
    pub fn new(name: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            model: model.into(),
        }
    }
}

/// Input to a rewrite call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewriteRequest {
    pub source_text: String,
    pub source_name: String,
    pub source_url: String,
}

/// Structured rewrite reply, as the provider contract defines it.
///
/// Field names match the JSON the providers are instructed to return.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewriteResult {
    pub title: String,
    pub excerpt: String,
    pub body_html: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl RewriteResult {
    /// Strict schema validation of a parsed provider reply.
    ///
    /// A violation here is a permanent failure: the provider broke its
    /// contract, and retrying would only mask the bug.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::empty_field("title"));
        }
        if self.excerpt.trim().is_empty() {
            return Err(ValidationError::empty_field("excerpt"));
        }
        if self.body_html.trim().is_empty() {
            return Err(ValidationError::empty_field("body_html"));
        }

        let title_chars = self.title.chars().count();
        if title_chars > MAX_TITLE_CHARS {
            return Err(ValidationError::too_long("title", MAX_TITLE_CHARS, title_chars));
        }
        let excerpt_chars = self.excerpt.chars().count();
        if excerpt_chars > MAX_EXCERPT_CHARS {
            return Err(ValidationError::too_long(
                "excerpt",
                MAX_EXCERPT_CHARS,
                excerpt_chars,
            ));
        }

        Ok(())
    }
}

/// A validated rewrite plus the prompt that produced it (for audit).
#[derive(Debug, Clone)]
pub struct RewriteOutput {
    pub result: RewriteResult,
    pub prompt: String,
}

/// An illustration prompt plus the instruction that produced it.
#[derive(Debug, Clone)]
pub struct ImagePromptOutput {
    /// The prompt to feed the image generator.
    pub prompt: String,
    /// The instruction sent to the LLM to derive it (for audit).
    pub request_prompt: String,
}

/// Port for text-rewrite providers.
#[async_trait]
pub trait Rewriter: Send + Sync {
    /// Rewrites a raw news item into publishable copy.
    ///
    /// Implementations must unwrap code fences or explanatory prose around
    /// the provider's JSON deterministically, parse strictly, and return
    /// `ProviderPermanent` for anything that cannot be repaired.
    async fn rewrite(&self, request: &RewriteRequest) -> Result<RewriteOutput, PipelineError>;

    /// Derives an editorial illustration prompt from rewritten copy.
    async fn image_prompt(
        &self,
        title: &str,
        excerpt: &str,
    ) -> Result<ImagePromptOutput, PipelineError>;

    /// Provider identity for logging and audit.
    fn info(&self) -> ProviderInfo;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(dead_code)]
    fn assert_object_safe(_: &dyn Rewriter) {}

    fn valid_result() -> RewriteResult {
        RewriteResult {
            title: "Short headline".to_string(),
            excerpt: "A concise excerpt.".to_string(),
            body_html: "<p>Body</p>".to_string(),
            tags: vec!["tech".to_string()],
            warnings: vec![],
        }
    }

    #[test]
    fn valid_result_passes_validation() {
        assert!(valid_result().validate().is_ok());
    }

    #[test]
    fn empty_required_fields_are_rejected() {
        let mut r = valid_result();
        r.title = "  ".to_string();
        assert!(r.validate().is_err());

        let mut r = valid_result();
        r.body_html = String::new();
        assert!(r.validate().is_err());
    }

    #[test]
    fn overlong_title_is_rejected() {
        let mut r = valid_result();
        r.title = "x".repeat(MAX_TITLE_CHARS + 1);
        assert_eq!(
            r.validate(),
            Err(ValidationError::too_long("title", 80, 81))
        );
    }

    #[test]
    fn overlong_excerpt_is_rejected() {
        let mut r = valid_result();
        r.excerpt = "y".repeat(MAX_EXCERPT_CHARS + 1);
        assert!(r.validate().is_err());
    }

    #[test]
    fn title_length_counts_chars_not_bytes() {
        let mut r = valid_result();
        r.title = "é".repeat(MAX_TITLE_CHARS); // 2 bytes per char
        assert!(r.validate().is_ok());
    }

    #[test]
    fn tags_and_warnings_default_to_empty_on_deserialize() {
        let json = r#"{"title":"T","excerpt":"E","body_html":"<p>B</p>"}"#;
        let r: RewriteResult = serde_json::from_str(json).unwrap();
        assert!(r.tags.is_empty());
        assert!(r.warnings.is_empty());
    }
}
