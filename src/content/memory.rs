//! content::memory
//!
//! In-memory content-addressed store.
//!
//! References are the lowercase hex SHA-256 of the stored bytes, so storing
//! the same payload twice yields the same reference.
//!
//! # Example
//!
//! ```
//! use collabdoc::content::{ContentStore, MemoryContentStore};
//!
//! # tokio_test::block_on(async {
//! let store = MemoryContentStore::new();
//! let reference = store.put(b"ciphertext".to_vec()).await.unwrap();
//! assert_eq!(store.get(&reference).await.unwrap(), b"ciphertext");
//! # });
//! ```

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use super::{ContentError, ContentStore};
use crate::core::types::ContentRef;

/// Content store for tests and single-process deployments.
///
/// Thread-safe via internal `Arc<Mutex<...>>` wrapping; clones share state.
#[derive(Debug, Clone, Default)]
pub struct MemoryContentStore {
    blobs: Arc<Mutex<HashMap<ContentRef, Vec<u8>>>>,
}

impl MemoryContentStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute the reference `bytes` would be stored under.
    pub fn reference_for(bytes: &[u8]) -> ContentRef {
        ContentRef::new(hex::encode(Sha256::digest(bytes)))
    }

    /// Number of distinct blobs stored.
    pub fn len(&self) -> usize {
        self.blobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn put(&self, bytes: Vec<u8>) -> Result<ContentRef, ContentError> {
        let reference = Self::reference_for(&bytes);
        self.blobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(reference.clone(), bytes);
        Ok(reference)
    }

    async fn get(&self, reference: &ContentRef) -> Result<Vec<u8>, ContentError> {
        self.blobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(reference)
            .cloned()
            .ok_or_else(|| ContentError::NotFound(reference.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn identical_payloads_share_a_reference() {
        let store = MemoryContentStore::new();
        let a = store.put(b"same".to_vec()).await.unwrap();
        let b = store.put(b"same".to_vec()).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(store.len(), 1);
        assert_eq!(a.as_str().len(), 64);
    }

    #[tokio::test]
    async fn unknown_reference_not_found() {
        let store = MemoryContentStore::new();
        let missing = ContentRef::new("deadbeef");
        assert_eq!(
            store.get(&missing).await,
            Err(ContentError::NotFound(missing))
        );
    }

    #[tokio::test]
    async fn clones_share_state() {
        let store = MemoryContentStore::new();
        let clone = store.clone();
        let r = store.put(b"x".to_vec()).await.unwrap();
        assert_eq!(clone.get(&r).await.unwrap(), b"x");
    }
}
