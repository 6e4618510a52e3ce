//! content - external content storage collaborator
//!
//! Document payloads are stored (already encrypted) outside the core and
//! addressed by opaque [`ContentRef`]s. The core never calls a
//! [`ContentStore`]; the editor layer puts content, then hands the resulting
//! reference to `save_version` or `update_document`.
//!
//! # Components
//!
//! - [`ContentStore`] - Async put/get by reference
//! - [`MemoryContentStore`] - Content-addressed in-memory implementation

mod memory;

pub use memory::MemoryContentStore;

use async_trait::async_trait;
use thiserror::Error;

use crate::core::types::ContentRef;

/// Errors from content storage.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContentError {
    /// No content stored under this reference.
    #[error("content not found: {0}")]
    NotFound(ContentRef),

    /// The backend failed.
    #[error("content store error: {0}")]
    Backend(String),
}

/// Trait for storing and retrieving opaque content blobs.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Store `bytes` and return the reference that retrieves them.
    async fn put(&self, bytes: Vec<u8>) -> Result<ContentRef, ContentError>;

    /// Fetch the bytes stored under `reference`.
    ///
    /// # Errors
    ///
    /// Returns [`ContentError::NotFound`] for unknown references.
    async fn get(&self, reference: &ContentRef) -> Result<Vec<u8>, ContentError>;
}
