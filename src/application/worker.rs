//! Stage worker - background polling loop around a `StageConsumer`.
//!
//! Each stage runs a small pool of identical workers. A worker polls its
//! queue on an interval, processes at most one delivery per tick, and
//! drains one final delivery on shutdown so acked-but-unfinished work is
//! never left behind.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{error, info};

use crate::application::stage_consumer::StageConsumer;

/// Configuration for a stage's worker pool.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// How often an idle worker polls its queue.
    pub poll_interval: Duration,
    /// Workers per stage.
    pub concurrency: u32,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(200),
            concurrency: 2,
        }
    }
}

impl WorkerConfig {
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_concurrency(mut self, concurrency: u32) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }
}

/// Polling worker for one stage queue.
pub struct StageWorker {
    consumer: Arc<StageConsumer>,
    config: WorkerConfig,
}

impl StageWorker {
    pub fn new(consumer: Arc<StageConsumer>, config: WorkerConfig) -> Self {
        Self { consumer, config }
    }

    /// Runs the poll loop until the shutdown signal flips to true.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = time::interval(self.config.poll_interval);
        let queue = self.consumer.queue();
        info!(queue, "stage worker started");

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        // Drain one last delivery, then stop.
                        self.poll(queue).await;
                        info!(queue, "stage worker stopped");
                        return;
                    }
                }

                _ = interval.tick() => {
                    self.poll(queue).await;
                }
            }
        }
    }

    async fn poll(&self, queue: &'static str) {
        if let Err(e) = self.consumer.poll_once().await {
            // Settlement errors are broker trouble; the message stays
            // unacked and will be redelivered.
            error!(queue, error = %e, "poll failed");
        }
    }
}

/// Spawns `config.concurrency` workers for one stage consumer.
pub fn spawn_workers(
    consumer: Arc<StageConsumer>,
    config: WorkerConfig,
    shutdown: watch::Receiver<bool>,
) -> Vec<JoinHandle<()>> {
    (0..config.concurrency)
        .map(|_| {
            let worker = StageWorker::new(consumer.clone(), config.clone());
            let shutdown = shutdown.clone();
            tokio::spawn(async move { worker.run(shutdown).await })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ai::MockRewriter;
    use crate::adapters::audit::InMemoryAuditLog;
    use crate::adapters::broker::{InMemoryBroker, StageJobPublisher};
    use crate::adapters::content_store::InMemoryContentStore;
    use crate::application::consumers::RewriteHandler;
    use crate::application::retry::RetryPolicy;
    use crate::domain::article::{Article, PipelineState};
    use crate::domain::foundation::ArticleId;
    use crate::domain::job::Stage;
    use crate::ports::JobPublisher;

    fn rewrite_consumer(
        broker: Arc<InMemoryBroker>,
        store: Arc<InMemoryContentStore>,
    ) -> Arc<StageConsumer> {
        Arc::new(StageConsumer::new(
            Arc::new(RewriteHandler::new(Arc::new(MockRewriter::new()))),
            store,
            Arc::new(InMemoryAuditLog::new()),
            broker.clone(),
            Arc::new(StageJobPublisher::new(broker)),
            RetryPolicy::default(),
        ))
    }

    #[tokio::test]
    async fn worker_processes_jobs_and_stops_on_shutdown() {
        let broker = Arc::new(InMemoryBroker::new());
        let store = Arc::new(InMemoryContentStore::new());
        let article_id = ArticleId::new(1);
        store
            .insert(Article::ingested(article_id, "raw", "Wire", "https://s"))
            .await;

        let publisher = StageJobPublisher::new(broker.clone());
        publisher.publish_initial(article_id).await.unwrap();

        let consumer = rewrite_consumer(broker.clone(), store.clone());
        let config = WorkerConfig::default().with_poll_interval(Duration::from_millis(10));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handles = spawn_workers(consumer, config, shutdown_rx);

        tokio::time::sleep(Duration::from_millis(100)).await;
        shutdown_tx.send(true).unwrap();
        for handle in handles {
            handle.await.unwrap();
        }

        let article = store.current(article_id).await.unwrap();
        assert_eq!(article.pipeline_state, PipelineState::Rewritten);
        assert_eq!(broker.queue_depth(Stage::Rewrite.queue()).await, 0);
    }

    #[test]
    fn concurrency_is_at_least_one() {
        let config = WorkerConfig::default().with_concurrency(0);
        assert_eq!(config.concurrency, 1);
    }
}
