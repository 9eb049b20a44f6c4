//! Broker topology: exchange, queues, bindings and dead-letter wiring.
//!
//! All stage traffic flows through one durable direct exchange. Each stage
//! queue is bound by its routing key and declares a dead-letter route to
//! the companion `.dlq` queue on the dead-letter exchange.

use crate::domain::job::Stage;

/// Durable direct exchange carrying all pipeline traffic.
pub const EXCHANGE: &str = "newsportal.exchange";

/// Dead-letter exchange; rejected messages are re-routed here.
pub const DEAD_LETTER_EXCHANGE: &str = "newsportal.exchange.dlx";

/// One queue binding in the topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueBinding {
    pub queue: &'static str,
    pub routing_key: &'static str,
    pub dead_letter_queue: &'static str,
}

/// The full binding table, one entry per stage.
pub fn bindings() -> [QueueBinding; 3] {
    [
        binding_for(Stage::Rewrite),
        binding_for(Stage::Illustrate),
        binding_for(Stage::Card),
    ]
}

fn binding_for(stage: Stage) -> QueueBinding {
    QueueBinding {
        queue: stage.queue(),
        routing_key: stage.routing_key(),
        dead_letter_queue: stage.dead_letter_queue(),
    }
}

/// Resolves a routing key to its bound queue.
pub fn queue_for_routing_key(routing_key: &str) -> Option<&'static str> {
    bindings()
        .into_iter()
        .find(|b| b.routing_key == routing_key)
        .map(|b| b.queue)
}

/// Resolves a queue to its dead-letter queue.
pub fn dead_letter_queue_for(queue: &str) -> Option<&'static str> {
    bindings()
        .into_iter()
        .find(|b| b.queue == queue)
        .map(|b| b.dead_letter_queue)
}
