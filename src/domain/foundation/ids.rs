//! Identifier value objects.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifier of an Article aggregate.
///
/// The content store owns id allocation; the pipeline only ever receives
/// existing ids, so any i64 is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArticleId(i64);

impl ArticleId {
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for ArticleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for ArticleId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Unique identifier of a published job, used for dedup and tracing.
///
/// Fresh per publish; preserved across requeue-with-backoff so one logical
/// job keeps one trace id through its retry attempts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    /// Creates a new random JobId using UUID v4.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Creates a JobId from an existing string. No validation is performed.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn article_id_round_trips_through_json_as_integer() {
        let id = ArticleId::new(42);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "42");

        let restored: ArticleId = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, id);
    }

    #[test]
    fn article_id_displays_raw_value() {
        assert_eq!(format!("{}", ArticleId::new(7)), "7");
    }

    #[test]
    fn job_id_generates_unique_values() {
        assert_ne!(JobId::new(), JobId::new());
    }

    #[test]
    fn job_id_from_string_preserves_value() {
        let id = JobId::from_string("job-123");
        assert_eq!(id.as_str(), "job-123");
        assert_eq!(format!("{}", id), "job-123");
    }

    #[test]
    fn job_id_serializes_transparently() {
        let id = JobId::from_string("job-xyz");
        assert_eq!(serde_json::to_string(&id).unwrap(), r#""job-xyz""#);
    }
}
