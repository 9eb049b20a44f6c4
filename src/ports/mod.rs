//! Ports - capability interfaces between the pipeline and its
//! collaborators.
//!
//! Adapters implement these traits; consumers and the publisher depend only
//! on the traits, never on a concrete provider or transport.

mod audit_log;
mod blob_store;
mod broker;
mod content_store;
mod illustrator;
mod rewriter;

pub use audit_log::AuditLog;
pub use blob_store::{object_key, BlobStore};
pub use broker::{Delivery, JobPublisher, MessageBroker};
pub use content_store::ContentStore;
pub use illustrator::{Illustrator, ImagePayload};
pub use rewriter::{
    ImagePromptOutput, ProviderInfo, RewriteOutput, RewriteRequest, RewriteResult, Rewriter,
    MAX_EXCERPT_CHARS, MAX_TITLE_CHARS,
};
