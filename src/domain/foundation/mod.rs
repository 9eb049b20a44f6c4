//! Foundation value objects and shared domain infrastructure.

mod errors;
mod ids;
mod state_machine;
mod timestamp;

pub use errors::{dead_letter_reason, FailureKind, PipelineError, ValidationError};
pub use ids::{ArticleId, JobId};
pub use state_machine::StateMachine;
pub use timestamp::Timestamp;
