//! Stage job publisher over a `MessageBroker`.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use crate::domain::foundation::{ArticleId, JobId, PipelineError};
use crate::domain::job::{JobMessage, Stage};
use crate::ports::{JobPublisher, MessageBroker};

/// Publishes stage jobs under each stage's routing key.
pub struct StageJobPublisher {
    broker: Arc<dyn MessageBroker>,
}

impl StageJobPublisher {
    pub fn new(broker: Arc<dyn MessageBroker>) -> Self {
        Self { broker }
    }
}

#[async_trait]
impl JobPublisher for StageJobPublisher {
    async fn publish(&self, article_id: ArticleId, stage: Stage) -> Result<JobId, PipelineError> {
        let message = JobMessage::new(article_id, stage);
        self.broker.publish(stage.routing_key(), &message).await?;

        info!(
            job_id = %message.job_id,
            article_id = %article_id,
            stage = %stage,
            routing_key = stage.routing_key(),
            "published stage job"
        );
        Ok(message.job_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::broker::InMemoryBroker;

    #[tokio::test]
    async fn publish_lands_on_the_stage_queue() {
        let broker = Arc::new(InMemoryBroker::new());
        let publisher = StageJobPublisher::new(broker.clone());

        publisher
            .publish(ArticleId::from(11), Stage::Illustrate)
            .await
            .unwrap();

        assert_eq!(broker.queue_depth("image_generation").await, 1);
        let delivery = broker.receive("image_generation").await.unwrap().unwrap();
        assert_eq!(delivery.message.article_id, ArticleId::from(11));
        assert_eq!(delivery.message.stage, Stage::Illustrate);
        assert_eq!(delivery.message.attempt, 0);
    }

    #[tokio::test]
    async fn publish_initial_starts_at_rewrite() {
        let broker = Arc::new(InMemoryBroker::new());
        let publisher = StageJobPublisher::new(broker.clone());

        publisher.publish_initial(ArticleId::from(3)).await.unwrap();

        assert_eq!(broker.queue_depth("news_rewrite").await, 1);
    }

    #[tokio::test]
    async fn broker_outage_surfaces_as_error() {
        let broker = Arc::new(InMemoryBroker::new());
        broker.fail_next_publishes(1);
        let publisher = StageJobPublisher::new(broker.clone());

        let err = publisher
            .publish(ArticleId::from(1), Stage::Rewrite)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::BrokerUnavailable { .. }));
        assert_eq!(broker.queue_depth("news_rewrite").await, 0);
    }

    #[tokio::test]
    async fn each_publish_gets_a_fresh_job_id() {
        let broker = Arc::new(InMemoryBroker::new());
        let publisher = StageJobPublisher::new(broker.clone());

        let a = publisher
            .publish(ArticleId::from(1), Stage::Rewrite)
            .await
            .unwrap();
        let b = publisher
            .publish(ArticleId::from(1), Stage::Rewrite)
            .await
            .unwrap();
        assert_ne!(a, b);
    }
}
