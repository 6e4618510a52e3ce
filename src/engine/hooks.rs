//! engine::hooks
//!
//! Observer hook fired when the engine appends a version.
//!
//! # Invariants
//!
//! - The hook runs while the document lock is held, so observers see
//!   versions of one document in commit order
//! - Observers must not block or wait on I/O; enqueue and return

use crate::core::graph::Version;
use crate::core::types::DocumentId;

/// Receives every version the engine commits.
pub trait VersionObserver: Send + Sync {
    /// Called after `version` has been appended to `document`.
    fn version_created(&self, document: DocumentId, version: &Version);
}
