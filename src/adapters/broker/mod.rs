//! Broker adapters: topology declarations, an in-memory broker, and the
//! stage job publisher.

mod in_memory;
mod publisher;
pub mod topology;

pub use in_memory::{DeadLetter, InMemoryBroker};
pub use publisher::StageJobPublisher;
