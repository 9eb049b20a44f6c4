//! Blob store adapters.

mod http;
mod in_memory;

pub use http::{HttpBlobStore, HttpBlobStoreConfig};
pub use in_memory::InMemoryBlobStore;
