//! Article aggregate and its pipeline state machine.
//!
//! The content store exclusively owns persistence; consumers hold a
//! transient in-memory copy for the duration of one job and write back
//! through an optimistic compare-and-swap on `version`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use super::foundation::{ArticleId, StateMachine, Timestamp, ValidationError};

/// Where an article sits in the transformation pipeline.
///
/// Moves forward only (INGESTED -> REWRITTEN -> ILLUSTRATED -> CARDED), or
/// to FAILED from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PipelineState {
    Ingested,
    Rewritten,
    Illustrated,
    Carded,
    Failed,
}

impl PipelineState {
    /// Position along the forward chain, used to order duplicate and
    /// reordered deliveries. FAILED has no rank - it is terminal sideways.
    pub fn rank(&self) -> Option<u8> {
        match self {
            PipelineState::Ingested => Some(0),
            PipelineState::Rewritten => Some(1),
            PipelineState::Illustrated => Some(2),
            PipelineState::Carded => Some(3),
            PipelineState::Failed => None,
        }
    }
}

impl StateMachine for PipelineState {
    fn can_transition_to(&self, target: &Self) -> bool {
        use PipelineState::*;
        matches!(
            (self, target),
            (Ingested, Rewritten)
                | (Rewritten, Illustrated)
                | (Illustrated, Carded)
                | (Ingested, Failed)
                | (Rewritten, Failed)
                | (Illustrated, Failed)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use PipelineState::*;
        match self {
            Ingested => vec![Rewritten, Failed],
            Rewritten => vec![Illustrated, Failed],
            Illustrated => vec![Carded, Failed],
            Carded => vec![],
            Failed => vec![],
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PipelineState::Ingested => "INGESTED",
            PipelineState::Rewritten => "REWRITTEN",
            PipelineState::Illustrated => "ILLUSTRATED",
            PipelineState::Carded => "CARDED",
            PipelineState::Failed => "FAILED",
        };
        write!(f, "{}", s)
    }
}

/// The article aggregate.
///
/// `raw_body`, `source_author` and `source_url` are immutable inputs set at
/// ingestion. Pipeline outputs are only ever written by the `apply_*`
/// methods while advancing out of the state that precedes their stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: ArticleId,

    // Immutable inputs
    pub raw_body: String,
    pub source_author: String,
    pub source_url: String,

    // Pipeline outputs
    pub title: Option<String>,
    pub excerpt: Option<String>,
    pub rendered_body: Option<String>,
    pub tags: BTreeSet<String>,
    pub primary_image_url: Option<String>,
    pub social_card_url: Option<String>,

    pub pipeline_state: PipelineState,

    /// Monotonic counter for optimistic concurrency. Bumped by the content
    /// store on every successful save.
    pub version: u64,

    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Article {
    /// Creates a freshly ingested article, as the (out-of-scope) ingestion
    /// path would hand it to the pipeline.
    pub fn ingested(
        id: ArticleId,
        raw_body: impl Into<String>,
        source_author: impl Into<String>,
        source_url: impl Into<String>,
    ) -> Self {
        let now = Timestamp::now();
        Self {
            id,
            raw_body: raw_body.into(),
            source_author: source_author.into(),
            source_url: source_url.into(),
            title: None,
            excerpt: None,
            rendered_body: None,
            tags: BTreeSet::new(),
            primary_image_url: None,
            social_card_url: None,
            pipeline_state: PipelineState::Ingested,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies a rewrite result: INGESTED -> REWRITTEN.
    pub fn apply_rewrite(
        &mut self,
        title: impl Into<String>,
        excerpt: impl Into<String>,
        rendered_body: impl Into<String>,
        tags: impl IntoIterator<Item = String>,
    ) -> Result<(), ValidationError> {
        let title = title.into();
        let rendered_body = rendered_body.into();
        if title.is_empty() {
            return Err(ValidationError::empty_field("title"));
        }
        if rendered_body.is_empty() {
            return Err(ValidationError::empty_field("rendered_body"));
        }

        self.pipeline_state = self.pipeline_state.transition_to(PipelineState::Rewritten)?;
        self.title = Some(title);
        self.excerpt = Some(excerpt.into());
        self.rendered_body = Some(rendered_body);
        self.tags = tags.into_iter().collect();
        self.touch();
        Ok(())
    }

    /// Applies a generated illustration: REWRITTEN -> ILLUSTRATED.
    pub fn apply_illustration(&mut self, image_url: impl Into<String>) -> Result<(), ValidationError> {
        let image_url = image_url.into();
        if image_url.is_empty() {
            return Err(ValidationError::empty_field("primary_image_url"));
        }

        self.pipeline_state = self
            .pipeline_state
            .transition_to(PipelineState::Illustrated)?;
        self.primary_image_url = Some(image_url);
        self.touch();
        Ok(())
    }

    /// Applies a social card: ILLUSTRATED -> CARDED (terminal).
    pub fn apply_social_card(&mut self, card_url: impl Into<String>) -> Result<(), ValidationError> {
        let card_url = card_url.into();
        if card_url.is_empty() {
            return Err(ValidationError::empty_field("social_card_url"));
        }

        self.pipeline_state = self.pipeline_state.transition_to(PipelineState::Carded)?;
        self.social_card_url = Some(card_url);
        self.touch();
        Ok(())
    }

    /// Moves the article to FAILED after a permanent error or retry
    /// exhaustion. No-op if already terminal.
    pub fn mark_failed(&mut self) {
        if !self.pipeline_state.is_terminal() {
            self.pipeline_state = PipelineState::Failed;
            self.touch();
        }
    }

    fn touch(&mut self) {
        self.updated_at = Timestamp::now();
    }
}
