//! Generic stage consumer: drives one `StageHandler` from its queue.
//!
//! The runner owns everything messaging-related so handlers stay pure
//! transformations: the idempotency gate, the optimistic save, the audit
//! write, publishing the next stage, and the ack/requeue/reject decision.
//!
//! ## Disposal rules
//!
//! Delivery is at-least-once and per-article ordering is not guaranteed, so
//! the aggregate's state decides what a delivery means:
//!
//! - state == the stage's expected state: run the transformation
//! - state == the stage's completed state: duplicate of finished work; ack,
//!   and republish the next stage so a crash between publish and ack cannot
//!   strand the chain
//! - state further ahead, or FAILED: stale duplicate; ack and drop
//! - state behind: the job overtook its predecessor; requeue briefly
//!   without consuming retry budget
//!
//! Errors requeue with exponential backoff while transient and under
//! budget; everything else dead-letters with a reason naming the stage.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tracing::{error, info, warn};

use crate::application::consumers::StageHandler;
use crate::application::retry::RetryPolicy;
use crate::domain::article::PipelineState;
use crate::domain::audit::AuditRecord;
use crate::domain::foundation::{
    dead_letter_reason, ArticleId, FailureKind, PipelineError, StateMachine,
};
use crate::domain::job::JobMessage;
use crate::ports::{AuditLog, ContentStore, Delivery, JobPublisher, MessageBroker};

/// How a delivery was settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Transformation ran, saved, audited; next stage published.
    Completed,
    /// Stale duplicate (aggregate ahead or FAILED); acked and dropped.
    AlreadyDone,
    /// Duplicate of finished work; acked after republishing the next stage.
    ChainRepaired,
    /// Aggregate not ready yet; requeued without consuming retry budget.
    OutOfOrder,
    /// Transient failure; requeued with backoff.
    Requeued { delay: Duration },
    /// Rejected to the stage's dead-letter queue.
    DeadLettered,
}

pub struct StageConsumer {
    handler: Arc<dyn StageHandler>,
    content_store: Arc<dyn ContentStore>,
    audit: Arc<dyn AuditLog>,
    broker: Arc<dyn MessageBroker>,
    publisher: Arc<dyn JobPublisher>,
    retry: RetryPolicy,
}

impl StageConsumer {
    pub fn new(
        handler: Arc<dyn StageHandler>,
        content_store: Arc<dyn ContentStore>,
        audit: Arc<dyn AuditLog>,
        broker: Arc<dyn MessageBroker>,
        publisher: Arc<dyn JobPublisher>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            handler,
            content_store,
            audit,
            broker,
            publisher,
            retry,
        }
    }

    /// Queue this consumer reads from.
    pub fn queue(&self) -> &'static str {
        self.handler.stage().queue()
    }

    /// Takes and processes at most one delivery.
    pub async fn poll_once(&self) -> Result<Option<Disposition>, PipelineError> {
        match self.broker.receive(self.queue()).await? {
            Some(delivery) => self.process(delivery).await.map(Some),
            None => Ok(None),
        }
    }

    /// Processes one delivery to settlement.
    pub async fn process(&self, delivery: Delivery) -> Result<Disposition, PipelineError> {
        let stage = self.handler.stage();
        let message = delivery.message.clone();

        let article = match self.content_store.get(message.article_id).await {
            Ok(article) => article,
            Err(error @ PipelineError::NotFound { .. }) => {
                warn!(
                    job_id = %message.job_id,
                    article_id = %message.article_id,
                    stage = %stage,
                    "job references a missing article, dead-lettering"
                );
                self.record_audit(AuditRecord::failure(
                    message.article_id,
                    stage,
                    json!({"job_id": message.job_id}),
                    error.to_string(),
                ))
                .await;
                self.broker
                    .reject(delivery, &dead_letter_reason(stage, &error))
                    .await?;
                return Ok(Disposition::DeadLettered);
            }
            Err(error) => {
                return self
                    .handle_failure(delivery, &message, error, json!({"job_id": message.job_id}))
                    .await;
            }
        };

        if article.pipeline_state != stage.expected_state() {
            return self
                .dispose_out_of_state(delivery, &message, article.pipeline_state)
                .await;
        }

        let input_snapshot = self.handler.input_snapshot(&article);
        let expected_version = article.version;

        let artifacts = match self.handler.transform(article).await {
            Ok(artifacts) => artifacts,
            Err(error) => {
                return self
                    .handle_failure(delivery, &message, error, input_snapshot)
                    .await;
            }
        };

        let saved = match self
            .content_store
            .save(artifacts.article, expected_version)
            .await
        {
            Ok(saved) => saved,
            Err(error) => {
                return self
                    .handle_failure(delivery, &message, error, input_snapshot)
                    .await;
            }
        };

        let mut record = AuditRecord::success(
            saved.id,
            stage,
            input_snapshot,
            artifacts.output_snapshot,
            artifacts.provider,
        );
        if let Some(prompt) = artifacts.prompt_text {
            record = record.with_prompt(prompt);
        }
        self.record_audit(record).await;

        if let Some(next) = stage.next() {
            if let Err(error) = self.publisher.publish(saved.id, next).await {
                // The stage result is already saved; requeue so redelivery
                // walks the chain-repair path and retries the publish.
                warn!(
                    job_id = %message.job_id,
                    article_id = %saved.id,
                    stage = %stage,
                    error = %error,
                    "next-stage publish failed after save, requeueing"
                );
                let delay = self.retry.delay_for(message.attempt);
                self.broker
                    .requeue(delivery, message.next_attempt(), delay)
                    .await?;
                return Ok(Disposition::Requeued { delay });
            }
        }

        info!(
            job_id = %message.job_id,
            article_id = %saved.id,
            stage = %stage,
            state = %saved.pipeline_state,
            version = saved.version,
            "stage completed"
        );
        self.broker.ack(delivery).await?;
        Ok(Disposition::Completed)
    }

    /// Settles a delivery whose aggregate is not in the stage's expected
    /// state. See the module docs for the rules.
    async fn dispose_out_of_state(
        &self,
        delivery: Delivery,
        message: &JobMessage,
        current: PipelineState,
    ) -> Result<Disposition, PipelineError> {
        let stage = self.handler.stage();

        if current == stage.completed_state() {
            if let Some(next) = stage.next() {
                if let Err(error) = self.publisher.publish(message.article_id, next).await {
                    warn!(
                        job_id = %message.job_id,
                        article_id = %message.article_id,
                        stage = %stage,
                        error = %error,
                        "chain-repair publish failed, requeueing"
                    );
                    self.broker
                        .requeue(delivery, message.clone(), self.retry.base_delay)
                        .await?;
                    return Ok(Disposition::OutOfOrder);
                }
                info!(
                    job_id = %message.job_id,
                    article_id = %message.article_id,
                    stage = %stage,
                    "duplicate of completed stage, republished next stage"
                );
                self.broker.ack(delivery).await?;
                return Ok(Disposition::ChainRepaired);
            }
            self.broker.ack(delivery).await?;
            return Ok(Disposition::AlreadyDone);
        }

        let behind = match (current.rank(), stage.expected_state().rank()) {
            // FAILED never resumes.
            (None, _) => false,
            (Some(current_rank), Some(expected_rank)) => current_rank < expected_rank,
            (Some(_), None) => false,
        };

        if behind {
            info!(
                job_id = %message.job_id,
                article_id = %message.article_id,
                stage = %stage,
                state = %current,
                "job arrived before its predecessor completed, requeueing"
            );
            self.broker
                .requeue(delivery, message.clone(), self.retry.base_delay)
                .await?;
            return Ok(Disposition::OutOfOrder);
        }

        info!(
            job_id = %message.job_id,
            article_id = %message.article_id,
            stage = %stage,
            state = %current,
            "stale duplicate, dropping"
        );
        self.broker.ack(delivery).await?;
        Ok(Disposition::AlreadyDone)
    }

    /// Audits a failed attempt, then requeues or dead-letters it.
    async fn handle_failure(
        &self,
        delivery: Delivery,
        message: &JobMessage,
        error: PipelineError,
        input_snapshot: serde_json::Value,
    ) -> Result<Disposition, PipelineError> {
        let stage = self.handler.stage();

        self.record_audit(AuditRecord::failure(
            message.article_id,
            stage,
            input_snapshot,
            error.to_string(),
        ))
        .await;

        if error.failure_kind() == FailureKind::Transient && !self.retry.is_exhausted(message.attempt)
        {
            let delay = self.retry.delay_for(message.attempt);
            warn!(
                job_id = %message.job_id,
                article_id = %message.article_id,
                stage = %stage,
                attempt = message.attempt,
                delay_secs = delay.as_secs(),
                error = %error,
                "transient failure, requeueing with backoff"
            );
            self.broker
                .requeue(delivery, message.next_attempt(), delay)
                .await?;
            return Ok(Disposition::Requeued { delay });
        }

        if error.failure_kind() == FailureKind::Transient {
            error!(
                job_id = %message.job_id,
                article_id = %message.article_id,
                stage = %stage,
                attempt = message.attempt,
                error = %error,
                "retry budget exhausted, dead-lettering"
            );
        } else {
            error!(
                job_id = %message.job_id,
                article_id = %message.article_id,
                stage = %stage,
                error = %error,
                "permanent failure, dead-lettering"
            );
        }

        self.fail_article(message.article_id).await;
        self.broker
            .reject(delivery, &dead_letter_reason(stage, &error))
            .await?;
        Ok(Disposition::DeadLettered)
    }

    /// Best-effort transition of the aggregate to FAILED. A lost optimistic
    /// race gets one reload-and-retry; anything else is logged and must not
    /// block the dead-lettering that follows.
    async fn fail_article(&self, article_id: ArticleId) {
        for _ in 0..2 {
            let mut article = match self.content_store.get(article_id).await {
                Ok(article) => article,
                Err(error) => {
                    warn!(
                        article_id = %article_id,
                        error = %error,
                        "could not load article to mark FAILED"
                    );
                    return;
                }
            };
            if article.pipeline_state.is_terminal() {
                return;
            }
            let expected_version = article.version;
            article.mark_failed();
            match self.content_store.save(article, expected_version).await {
                Ok(_) => return,
                Err(PipelineError::VersionConflict { .. }) => continue,
                Err(error) => {
                    warn!(
                        article_id = %article_id,
                        error = %error,
                        "could not mark article FAILED"
                    );
                    return;
                }
            }
        }
        warn!(
            article_id = %article_id,
            "could not mark article FAILED, lost the version race twice"
        );
    }

    async fn record_audit(&self, record: AuditRecord) {
        let article_id = record.entity_id;
        if let Err(error) = self.audit.record(record).await {
            error!(
                article_id = %article_id,
                error = %error,
                "failed to append audit record"
            );
        }
    }
}
