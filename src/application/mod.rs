//! Application layer - the stage consumers and the machinery that runs
//! them against the broker.

pub mod consumers;
pub mod retry;
pub mod stage_consumer;
pub mod worker;

pub use consumers::{CardHandler, IllustrateHandler, RewriteHandler, StageArtifacts, StageHandler};
pub use retry::RetryPolicy;
pub use stage_consumer::{Disposition, StageConsumer};
pub use worker::{spawn_workers, StageWorker, WorkerConfig};
