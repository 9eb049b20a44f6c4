//! NewsPortal pipeline - asynchronous AI content transformation.
//!
//! Ingested news articles are rewritten, illustrated and given a
//! social-sharing card by three broker-driven stages, each idempotent
//! under at-least-once delivery.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
