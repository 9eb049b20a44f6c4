//! Shared parsing of LLM rewrite responses.
//!
//! Chat models wrap JSON answers in markdown code fences or surround them
//! with prose, despite instructions not to. Unwrapping is deterministic:
//! fence stripping first, then outermost-brace extraction. A response that
//! still fails to parse or validate is a permanent failure - retrying the
//! same parse cannot succeed, and the model has already been paid for.

use crate::domain::foundation::PipelineError;
use crate::ports::RewriteResult;

/// Strips a markdown code fence (``` or ```json) wrapping the payload.
/// Returns the input unchanged when no fence is present.
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Language tag up to the first newline ("json", "html", or empty).
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    body.trim_end_matches('`').trim()
}

/// Extracts the outermost JSON object from a response that may carry prose
/// before or after it.
pub fn extract_json_object(raw: &str) -> Option<&str> {
    let unfenced = strip_code_fence(raw);
    let start = unfenced.find('{')?;
    let end = unfenced.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&unfenced[start..=end])
}

/// Parses and validates a model's rewrite answer.
///
/// # Errors
///
/// `PipelineError::ProviderPermanent` when no JSON object can be located,
/// the JSON does not deserialize, or the result fails validation (empty or
/// over-length fields).
pub fn parse_rewrite_result(raw: &str) -> Result<RewriteResult, PipelineError> {
    let json = extract_json_object(raw).ok_or_else(|| {
        PipelineError::permanent(format!(
            "model response contains no JSON object: {:.120}",
            raw.trim()
        ))
    })?;

    let result: RewriteResult = serde_json::from_str(json)
        .map_err(|e| PipelineError::permanent(format!("model response is not valid JSON: {e}")))?;

    result
        .validate()
        .map_err(|e| PipelineError::permanent(format!("model response failed validation: {e}")))?;

    Ok(result)
}

/// Normalizes a model's plain-text answer (image prompts): fence-stripped,
/// trimmed, surrounding quotes removed.
pub fn clean_text_response(raw: &str) -> Result<String, PipelineError> {
    let cleaned = strip_code_fence(raw)
        .trim()
        .trim_matches('"')
        .trim()
        .to_string();
    if cleaned.is_empty() {
        return Err(PipelineError::permanent("model returned an empty response"));
    }
    Ok(cleaned)
}
