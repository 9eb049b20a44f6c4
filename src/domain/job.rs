//! Pipeline stage enum and the job message that travels over the broker.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::article::PipelineState;
use super::foundation::{ArticleId, JobId, Timestamp};

/// One causal step of the pipeline.
///
/// Stage order is significant: the illustration prompt depends on the
/// rewritten text and the social card depends on the generated image, so
/// each consumer publishes only the next stage after its own success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    Rewrite,
    Illustrate,
    Card,
}

impl Stage {
    /// All stages in causal order.
    pub const ALL: [Stage; 3] = [Stage::Rewrite, Stage::Illustrate, Stage::Card];

    /// Queue this stage's consumer is bound to.
    pub fn queue(&self) -> &'static str {
        match self {
            Stage::Rewrite => "news_rewrite",
            Stage::Illustrate => "image_generation",
            Stage::Card => "social_card_generation",
        }
    }

    /// Routing key the stage's queue is bound under on the exchange.
    pub fn routing_key(&self) -> &'static str {
        match self {
            Stage::Rewrite => "news.rewrite",
            Stage::Illustrate => "news.image.generate",
            Stage::Card => "news.social.card",
        }
    }

    /// Dead-letter queue for this stage.
    pub fn dead_letter_queue(&self) -> &'static str {
        match self {
            Stage::Rewrite => "news_rewrite.dlq",
            Stage::Illustrate => "image_generation.dlq",
            Stage::Card => "social_card_generation.dlq",
        }
    }

    /// Aggregate state a consumer requires before running this stage.
    pub fn expected_state(&self) -> PipelineState {
        match self {
            Stage::Rewrite => PipelineState::Ingested,
            Stage::Illustrate => PipelineState::Rewritten,
            Stage::Card => PipelineState::Illustrated,
        }
    }

    /// Aggregate state this stage leaves behind on success.
    pub fn completed_state(&self) -> PipelineState {
        match self {
            Stage::Rewrite => PipelineState::Rewritten,
            Stage::Illustrate => PipelineState::Illustrated,
            Stage::Card => PipelineState::Carded,
        }
    }

    /// The stage to publish after this one succeeds, if any.
    pub fn next(&self) -> Option<Stage> {
        match self {
            Stage::Rewrite => Some(Stage::Illustrate),
            Stage::Illustrate => Some(Stage::Card),
            Stage::Card => None,
        }
    }

    /// Lowercase slug used in blob key hints.
    pub fn slug(&self) -> &'static str {
        match self {
            Stage::Rewrite => "rewrite",
            Stage::Illustrate => "illustrate",
            Stage::Card => "card",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Rewrite => "REWRITE",
            Stage::Illustrate => "ILLUSTRATE",
            Stage::Card => "CARD",
        };
        write!(f, "{}", s)
    }
}

/// Value message published for one stage of one article.
///
/// Jobs are owned by the broker queue they sit in; consumers only ever hold
/// one for the duration of a delivery. Unknown fields in the wire payload are
/// ignored so the format stays forward-compatible.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobMessage {
    pub job_id: JobId,
    pub article_id: ArticleId,
    pub stage: Stage,
    /// Retry counter, starts at 0 on first publish.
    #[serde(default)]
    pub attempt: u32,
    pub enqueued_at: Timestamp,
}

impl JobMessage {
    /// Creates a fresh job (attempt 0, new job id, enqueued now).
    pub fn new(article_id: ArticleId, stage: Stage) -> Self {
        Self {
            job_id: JobId::new(),
            article_id,
            stage,
            attempt: 0,
            enqueued_at: Timestamp::now(),
        }
    }

    /// The same logical job, one retry later. Keeps the job id so the retry
    /// chain stays traceable.
    pub fn next_attempt(&self) -> Self {
        Self {
            job_id: self.job_id.clone(),
            article_id: self.article_id,
            stage: self.stage,
            attempt: self.attempt + 1,
            enqueued_at: Timestamp::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_serializes_screaming_snake_case() {
        assert_eq!(serde_json::to_string(&Stage::Rewrite).unwrap(), "\"REWRITE\"");
        assert_eq!(
            serde_json::to_string(&Stage::Illustrate).unwrap(),
            "\"ILLUSTRATE\""
        );
        assert_eq!(serde_json::to_string(&Stage::Card).unwrap(), "\"CARD\"");
    }

    #[test]
    fn stage_queue_and_routing_key_match_topology() {
        assert_eq!(Stage::Rewrite.queue(), "news_rewrite");
        assert_eq!(Stage::Illustrate.queue(), "image_generation");
        assert_eq!(Stage::Card.queue(), "social_card_generation");

        assert_eq!(Stage::Rewrite.routing_key(), "news.rewrite");
        assert_eq!(Stage::Illustrate.routing_key(), "news.image.generate");
        assert_eq!(Stage::Card.routing_key(), "news.social.card");
    }

    #[test]
    fn stage_chain_is_rewrite_illustrate_card() {
        assert_eq!(Stage::Rewrite.next(), Some(Stage::Illustrate));
        assert_eq!(Stage::Illustrate.next(), Some(Stage::Card));
        assert_eq!(Stage::Card.next(), None);
    }

    #[test]
    fn stage_preconditions_line_up_with_completions() {
        for stage in Stage::ALL {
            if let Some(next) = stage.next() {
                assert_eq!(stage.completed_state(), next.expected_state());
            }
        }
    }

    #[test]
    fn job_message_wire_format() {
        let job = JobMessage::new(ArticleId::new(7), Stage::Rewrite);
        let json = serde_json::to_value(&job).unwrap();

        assert_eq!(json["article_id"], 7);
        assert_eq!(json["stage"], "REWRITE");
        assert_eq!(json["attempt"], 0);
        assert!(json["job_id"].is_string());
        assert!(json["enqueued_at"].is_string());
    }

    #[test]
    fn job_message_ignores_unknown_fields() {
        let json = r#"{
            "job_id": "j-1",
            "article_id": 3,
            "stage": "CARD",
            "attempt": 2,
            "enqueued_at": "2024-01-15T10:30:00Z",
            "some_future_field": true
        }"#;

        let job: JobMessage = serde_json::from_str(json).unwrap();
        assert_eq!(job.stage, Stage::Card);
        assert_eq!(job.attempt, 2);
    }

    #[test]
    fn next_attempt_increments_but_keeps_job_id() {
        let job = JobMessage::new(ArticleId::new(1), Stage::Illustrate);
        let retry = job.next_attempt();

        assert_eq!(retry.job_id, job.job_id);
        assert_eq!(retry.attempt, 1);
        assert_eq!(retry.stage, Stage::Illustrate);
    }

    #[test]
    fn missing_attempt_defaults_to_zero() {
        let json = r#"{
            "job_id": "j-2",
            "article_id": 5,
            "stage": "REWRITE",
            "enqueued_at": "2024-01-15T10:30:00Z"
        }"#;

        let job: JobMessage = serde_json::from_str(json).unwrap();
        assert_eq!(job.attempt, 0);
    }
}
