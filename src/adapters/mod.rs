//! Adapters - concrete implementations of the ports.

pub mod ai;
pub mod audit;
pub mod blob;
pub mod broker;
pub mod content_store;
