//! In-memory broker for tests and local runs.
//!
//! Models the topology semantics a real broker enforces: routing-key
//! dispatch, per-queue FIFO, unacked tracking, dead-letter capture with
//! reasons, and delayed requeue. Delivery is at-least-once: unsettled
//! deliveries can be pushed back for redelivery.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::domain::foundation::PipelineError;
use crate::domain::job::JobMessage;
use crate::ports::{Delivery, MessageBroker};

use super::topology;

/// A dead-lettered message together with its rejection reason.
#[derive(Debug, Clone)]
pub struct DeadLetter {
    pub message: JobMessage,
    pub reason: String,
}

#[derive(Default)]
struct BrokerState {
    queues: HashMap<&'static str, VecDeque<QueuedMessage>>,
    /// Delivered but not yet settled, keyed by delivery tag.
    unacked: HashMap<u64, Delivery>,
    dead_letters: HashMap<&'static str, Vec<DeadLetter>>,
    published: u64,
}

#[derive(Debug, Clone)]
struct QueuedMessage {
    message: JobMessage,
    redelivered: bool,
}

#[derive(Clone, Default)]
pub struct InMemoryBroker {
    state: Arc<Mutex<BrokerState>>,
    next_tag: Arc<AtomicU64>,
    /// Number of upcoming publishes to fail, for outage tests.
    publish_outages: Arc<AtomicU32>,
}

impl InMemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails the next `count` publishes with `BrokerUnavailable`.
    pub fn fail_next_publishes(&self, count: u32) {
        self.publish_outages.store(count, Ordering::SeqCst);
    }

    pub async fn queue_depth(&self, queue: &str) -> usize {
        let state = self.state.lock().await;
        state.queues.get(queue).map_or(0, VecDeque::len)
    }

    pub async fn dead_letters(&self, dlq: &str) -> Vec<DeadLetter> {
        let state = self.state.lock().await;
        state.dead_letters.get(dlq).cloned().unwrap_or_default()
    }

    pub async fn published_count(&self) -> u64 {
        self.state.lock().await.published
    }

    pub async fn unacked_count(&self) -> usize {
        self.state.lock().await.unacked.len()
    }

    /// Pushes every unsettled delivery back to the front of its queue,
    /// marked redelivered. Simulates a consumer crash.
    pub async fn redeliver_unacked(&self) {
        let mut state = self.state.lock().await;
        let unacked: Vec<Delivery> = state.unacked.drain().map(|(_, d)| d).collect();
        for delivery in unacked {
            state
                .queues
                .entry(delivery.queue)
                .or_default()
                .push_front(QueuedMessage {
                    message: delivery.message,
                    redelivered: true,
                });
        }
    }

    async fn settle(&self, delivery: &Delivery) -> Result<(), PipelineError> {
        let mut state = self.state.lock().await;
        state
            .unacked
            .remove(&delivery.delivery_tag)
            .map(|_| ())
            .ok_or_else(|| {
                PipelineError::broker_unavailable(format!(
                    "delivery tag {} is not outstanding",
                    delivery.delivery_tag
                ))
            })
    }

    async fn enqueue(&self, queue: &'static str, queued: QueuedMessage) {
        let mut state = self.state.lock().await;
        state.queues.entry(queue).or_default().push_back(queued);
    }
}

#[async_trait]
impl MessageBroker for InMemoryBroker {
    async fn publish(&self, routing_key: &str, message: &JobMessage) -> Result<(), PipelineError> {
        if self.publish_outages.load(Ordering::SeqCst) > 0 {
            self.publish_outages.fetch_sub(1, Ordering::SeqCst);
            return Err(PipelineError::broker_unavailable(
                "broker connection refused",
            ));
        }

        let queue = topology::queue_for_routing_key(routing_key).ok_or_else(|| {
            PipelineError::broker_unavailable(format!(
                "no queue bound for routing key {routing_key}"
            ))
        })?;

        let mut state = self.state.lock().await;
        state.published += 1;
        state.queues.entry(queue).or_default().push_back(QueuedMessage {
            message: message.clone(),
            redelivered: false,
        });
        Ok(())
    }

    async fn receive(&self, queue: &'static str) -> Result<Option<Delivery>, PipelineError> {
        let mut state = self.state.lock().await;
        let Some(queued) = state.queues.get_mut(queue).and_then(VecDeque::pop_front) else {
            return Ok(None);
        };

        let delivery = Delivery {
            delivery_tag: self.next_tag.fetch_add(1, Ordering::SeqCst) + 1,
            queue,
            redelivered: queued.redelivered,
            message: queued.message,
        };
        state.unacked.insert(delivery.delivery_tag, delivery.clone());
        Ok(Some(delivery))
    }

    async fn ack(&self, delivery: Delivery) -> Result<(), PipelineError> {
        self.settle(&delivery).await
    }

    async fn reject(&self, delivery: Delivery, reason: &str) -> Result<(), PipelineError> {
        self.settle(&delivery).await?;

        let dlq = topology::dead_letter_queue_for(delivery.queue).ok_or_else(|| {
            PipelineError::broker_unavailable(format!(
                "queue {} has no dead-letter route",
                delivery.queue
            ))
        })?;

        let mut state = self.state.lock().await;
        state.dead_letters.entry(dlq).or_default().push(DeadLetter {
            message: delivery.message,
            reason: reason.to_string(),
        });
        Ok(())
    }

    async fn requeue(
        &self,
        delivery: Delivery,
        message: JobMessage,
        delay: Duration,
    ) -> Result<(), PipelineError> {
        self.settle(&delivery).await?;

        let queued = QueuedMessage {
            message,
            redelivered: true,
        };

        if delay.is_zero() {
            self.enqueue(delivery.queue, queued).await;
        } else {
            let broker = self.clone();
            let queue = delivery.queue;
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                broker.enqueue(queue, queued).await;
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::ArticleId;
    use crate::domain::job::Stage;

    fn message(stage: Stage) -> JobMessage {
        JobMessage::new(ArticleId::from(7), stage)
    }

    #[tokio::test]
    async fn publish_routes_by_key() {
        let broker = InMemoryBroker::new();
        broker
            .publish("news.rewrite", &message(Stage::Rewrite))
            .await
            .unwrap();

        assert_eq!(broker.queue_depth("news_rewrite").await, 1);
        assert_eq!(broker.queue_depth("image_generation").await, 0);
        assert_eq!(broker.published_count().await, 1);
    }

    #[tokio::test]
    async fn unknown_routing_key_is_an_error() {
        let broker = InMemoryBroker::new();
        let err = broker
            .publish("news.unknown", &message(Stage::Rewrite))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::BrokerUnavailable { .. }));
    }

    #[tokio::test]
    async fn receive_then_ack_discards() {
        let broker = InMemoryBroker::new();
        broker
            .publish("news.rewrite", &message(Stage::Rewrite))
            .await
            .unwrap();

        let delivery = broker.receive("news_rewrite").await.unwrap().unwrap();
        assert!(!delivery.redelivered);
        assert_eq!(broker.unacked_count().await, 1);

        broker.ack(delivery).await.unwrap();
        assert_eq!(broker.unacked_count().await, 0);
        assert_eq!(broker.queue_depth("news_rewrite").await, 0);
    }

    #[tokio::test]
    async fn double_settle_is_rejected() {
        let broker = InMemoryBroker::new();
        broker
            .publish("news.rewrite", &message(Stage::Rewrite))
            .await
            .unwrap();

        let delivery = broker.receive("news_rewrite").await.unwrap().unwrap();
        broker.ack(delivery.clone()).await.unwrap();
        assert!(broker.ack(delivery).await.is_err());
    }

    #[tokio::test]
    async fn reject_lands_in_dlq_with_reason() {
        let broker = InMemoryBroker::new();
        broker
            .publish("news.image.generate", &message(Stage::Illustrate))
            .await
            .unwrap();

        let delivery = broker.receive("image_generation").await.unwrap().unwrap();
        broker
            .reject(delivery, "ILLUSTRATE: provider rejected prompt")
            .await
            .unwrap();

        let dead = broker.dead_letters("image_generation.dlq").await;
        assert_eq!(dead.len(), 1);
        assert_eq!(dead[0].reason, "ILLUSTRATE: provider rejected prompt");
        assert_eq!(broker.queue_depth("image_generation").await, 0);
    }

    #[tokio::test]
    async fn immediate_requeue_marks_redelivered() {
        let broker = InMemoryBroker::new();
        broker
            .publish("news.rewrite", &message(Stage::Rewrite))
            .await
            .unwrap();

        let delivery = broker.receive("news_rewrite").await.unwrap().unwrap();
        let retry = delivery.message.next_attempt();
        broker
            .requeue(delivery, retry, Duration::ZERO)
            .await
            .unwrap();

        let redelivery = broker.receive("news_rewrite").await.unwrap().unwrap();
        assert!(redelivery.redelivered);
        assert_eq!(redelivery.message.attempt, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn delayed_requeue_waits_out_the_delay() {
        let broker = InMemoryBroker::new();
        broker
            .publish("news.rewrite", &message(Stage::Rewrite))
            .await
            .unwrap();

        let delivery = broker.receive("news_rewrite").await.unwrap().unwrap();
        let retry = delivery.message.clone();
        broker
            .requeue(delivery, retry, Duration::from_secs(4))
            .await
            .unwrap();

        assert_eq!(broker.queue_depth("news_rewrite").await, 0);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(broker.queue_depth("news_rewrite").await, 1);
    }

    #[tokio::test]
    async fn redeliver_unacked_simulates_consumer_crash() {
        let broker = InMemoryBroker::new();
        broker
            .publish("news.rewrite", &message(Stage::Rewrite))
            .await
            .unwrap();

        let _dropped = broker.receive("news_rewrite").await.unwrap().unwrap();
        broker.redeliver_unacked().await;

        let redelivery = broker.receive("news_rewrite").await.unwrap().unwrap();
        assert!(redelivery.redelivered);
    }

    #[tokio::test]
    async fn scripted_outage_fails_publishes() {
        let broker = InMemoryBroker::new();
        broker.fail_next_publishes(1);

        assert!(broker
            .publish("news.rewrite", &message(Stage::Rewrite))
            .await
            .is_err());
        assert!(broker
            .publish("news.rewrite", &message(Stage::Rewrite))
            .await
            .is_ok());
    }
}
