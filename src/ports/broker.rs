//! Broker and job publisher ports.
//!
//! The broker guarantees at-least-once delivery per message and no ordering
//! across articles. Messages are rejected (not requeued in place) on
//! unrecoverable failure so dead-letter routing fires; delayed requeue is a
//! fresh publish of the same logical job with its attempt counter bumped.

use async_trait::async_trait;
use std::time::Duration;

use crate::domain::foundation::{ArticleId, JobId, PipelineError};
use crate::domain::job::{JobMessage, Stage};

/// One delivery of a job message from a stage queue.
///
/// A delivery must be settled exactly once: `ack`, `reject` or `requeue`. A
/// worker shut down mid-job simply drops it and the broker redelivers.
#[derive(Debug, Clone)]
pub struct Delivery {
    /// Broker-assigned tag identifying this delivery attempt.
    pub delivery_tag: u64,
    /// Queue the message was consumed from.
    pub queue: &'static str,
    /// Whether the broker has delivered this message before.
    pub redelivered: bool,
    pub message: JobMessage,
}

/// Port over the message broker.
#[async_trait]
pub trait MessageBroker: Send + Sync {
    /// Publishes a durable message under the routing key.
    ///
    /// # Errors
    ///
    /// `PipelineError::BrokerUnavailable` if the broker cannot accept the
    /// message. Never silently dropped.
    async fn publish(&self, routing_key: &str, message: &JobMessage) -> Result<(), PipelineError>;

    /// Takes the next available delivery from a queue, if any.
    async fn receive(&self, queue: &'static str) -> Result<Option<Delivery>, PipelineError>;

    /// Acknowledges a delivery; the broker discards the message.
    async fn ack(&self, delivery: Delivery) -> Result<(), PipelineError>;

    /// Rejects a delivery without requeue; the broker routes the message to
    /// the queue's dead-letter queue together with the reason.
    async fn reject(&self, delivery: Delivery, reason: &str) -> Result<(), PipelineError>;

    /// Settles a delivery and re-enqueues `message` on the same queue after
    /// `delay`. Used for the backoff ladder and for out-of-order messages.
    async fn requeue(
        &self,
        delivery: Delivery,
        message: JobMessage,
        delay: Duration,
    ) -> Result<(), PipelineError>;
}

/// Port for starting or advancing the pipeline.
///
/// The publisher only ever emits the *next* stage for an article - never an
/// eager fan-out of all stages - because stage order is causally
/// significant.
#[async_trait]
pub trait JobPublisher: Send + Sync {
    /// Enqueues a fresh job for the stage and returns its id.
    ///
    /// # Errors
    ///
    /// `PipelineError::BrokerUnavailable`; the caller must retry or
    /// escalate.
    async fn publish(&self, article_id: ArticleId, stage: Stage) -> Result<JobId, PipelineError>;

    /// Starts the pipeline for a freshly ingested article.
    async fn publish_initial(&self, article_id: ArticleId) -> Result<JobId, PipelineError> {
        self.publish(article_id, Stage::Rewrite).await
    }
}
