//! core::registry
//!
//! Keyed store of documents; the single source of truth for whether a
//! document exists.
//!
//! # Concurrency
//!
//! The id → document map sits behind one `RwLock` that is held only for the
//! lookup or insert itself. Each document lives behind its own `Mutex`, so
//! mutations of different documents never block each other and mutations of
//! the same document are serialized.
//!
//! Nothing that waits on I/O may run while a document lock is held.
//!
//! # Example
//!
//! ```
//! use collabdoc::core::registry::DocumentRegistry;
//! use collabdoc::core::types::{ContentRef, UserId};
//!
//! let registry = DocumentRegistry::new();
//! let owner = UserId::new("u1").unwrap();
//! let doc = registry.create("Spec", ContentRef::new("cid-0"), owner);
//!
//! let title = registry
//!     .with_document(doc.id(), |d| d.title().to_string())
//!     .unwrap();
//! assert_eq!(title, "Spec");
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use tracing::debug;

use super::errors::CoreError;
use super::graph::Document;
use super::types::{ContentRef, DocumentId, UserId};

/// Shared handle to one document's lock.
pub type DocumentHandle = Arc<Mutex<Document>>;

/// Lock a document.
///
/// A poisoned lock is recovered: every mutation is checked against the graph
/// invariants before it returns, so a panic elsewhere cannot leave the
/// document half-updated.
pub fn lock_document(handle: &DocumentHandle) -> MutexGuard<'_, Document> {
    handle.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Store of all documents, constructed once and shared by reference.
#[derive(Debug, Default)]
pub struct DocumentRegistry {
    documents: RwLock<HashMap<DocumentId, DocumentHandle>>,
}

impl DocumentRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create and store a document with one initial version on `master`.
    ///
    /// Returns a snapshot of the stored document.
    pub fn create(
        &self,
        title: impl Into<String>,
        content_ref: ContentRef,
        owner_id: UserId,
    ) -> Document {
        let doc = Document::new(DocumentId::generate(), title, content_ref, owner_id);
        let snapshot = doc.clone();
        self.insert(doc);
        debug!(document = %snapshot.id(), owner = %snapshot.owner_id(), "document created");
        snapshot
    }

    /// Store a document, replacing any existing document with the same id.
    pub fn insert(&self, doc: Document) {
        let mut documents = self
            .documents
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        documents.insert(doc.id(), Arc::new(Mutex::new(doc)));
    }

    /// Look up a document's handle.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] if no document has this id.
    pub fn find_by_id(&self, id: DocumentId) -> Result<DocumentHandle, CoreError> {
        let documents = self
            .documents
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        documents.get(&id).cloned().ok_or(CoreError::NotFound(id))
    }

    /// Run `f` with exclusive access to one document.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] if no document has this id.
    pub fn with_document<R>(
        &self,
        id: DocumentId,
        f: impl FnOnce(&mut Document) -> R,
    ) -> Result<R, CoreError> {
        let handle = self.find_by_id(id)?;
        let mut doc = lock_document(&handle);
        Ok(f(&mut doc))
    }

    /// Number of stored documents.
    pub fn len(&self) -> usize {
        self.documents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether the registry holds no documents.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
