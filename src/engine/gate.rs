//! engine::gate
//!
//! Permission gating for document operations.
//!
//! # Architecture
//!
//! Each operation declares the single permission it requires as a
//! [`RequirementSet`]. Gating evaluates that requirement against the
//! document's access list while the caller holds the document lock, so the
//! check and the mutation observe the same state.
//!
//! # Invariants
//!
//! - Gating never mutates the document
//! - A denied requirement always maps to [`CoreError::Forbidden`] naming the
//!   missing permission
//!
//! # Example
//!
//! ```
//! use collabdoc::core::graph::Document;
//! use collabdoc::core::types::{ContentRef, DocumentId, UserId};
//! use collabdoc::engine::gate::{gate, requirements};
//!
//! let owner = UserId::new("u1").unwrap();
//! let doc = Document::new(DocumentId::generate(), "Spec", ContentRef::default(), owner.clone());
//!
//! assert!(gate(&doc, &owner, &requirements::WRITE).is_ok());
//! assert!(gate(&doc, &UserId::new("u2").unwrap(), &requirements::READ).is_err());
//! ```

use crate::core::access::has_permission;
use crate::core::errors::CoreError;
use crate::core::graph::Document;
use crate::core::types::{Permission, UserId};

/// Requirement an operation must satisfy to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequirementSet {
    /// Human-readable name for this requirement set.
    pub name: &'static str,
    /// Permission the caller must hold.
    pub permission: Permission,
}

impl RequirementSet {
    /// Create a new requirement set.
    pub const fn new(name: &'static str, permission: Permission) -> Self {
        Self { name, permission }
    }

    /// Check if `user` satisfies this requirement on `doc`.
    pub fn satisfied_by(&self, doc: &Document, user: &UserId) -> bool {
        has_permission(doc, user, self.permission)
    }
}

/// Predefined requirement sets.
pub mod requirements {
    use super::*;

    /// Viewing a document, joining its session, switching branches.
    pub const READ: RequirementSet = RequirementSet::new("read", Permission::Read);

    /// Saving versions, live edits, creating and merging branches,
    /// moving the content pointer.
    pub const WRITE: RequirementSet = RequirementSet::new("write", Permission::Write);

    /// Managing the collaborator list.
    pub const ADMIN: RequirementSet = RequirementSet::new("admin", Permission::Admin);
}

/// Gate an operation on `doc` for `user`.
///
/// # Errors
///
/// Returns [`CoreError::Forbidden`] if the requirement is not satisfied.
pub fn gate(doc: &Document, user: &UserId, requirement: &RequirementSet) -> Result<(), CoreError> {
    if requirement.satisfied_by(doc, user) {
        Ok(())
    } else {
        Err(CoreError::Forbidden {
            document: doc.id(),
            user: user.clone(),
            permission: requirement.permission,
        })
    }
}
