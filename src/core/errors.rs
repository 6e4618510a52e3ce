//! core::errors
//!
//! Error taxonomy for document and version graph operations.
//!
//! All variants are user-visible and non-fatal: they are returned to the
//! caller that issued the request and never affect other participants.
//!
//! # Example
//!
//! ```
//! use collabdoc::core::errors::CoreError;
//! use collabdoc::core::types::BranchName;
//!
//! let err = CoreError::BranchNotFound(BranchName::new("feature").unwrap());
//! assert_eq!(err.code(), "branch_not_found");
//! assert!(err.to_string().contains("feature"));
//! ```

use thiserror::Error;

use super::types::{BranchName, DocumentId, Permission, UserId, VersionId};

/// Errors from document, registry, and access operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// The principal lacks the permission the operation requires.
    #[error("forbidden: user '{user}' lacks '{permission}' permission on document {document}")]
    Forbidden {
        document: DocumentId,
        user: UserId,
        permission: Permission,
    },

    /// The document does not exist in the registry.
    #[error("document not found: {0}")]
    NotFound(DocumentId),

    /// The named branch does not exist on the document.
    #[error("branch not found: {0}")]
    BranchNotFound(BranchName),

    /// A supplied version id does not exist on the document.
    #[error("invalid reference: version {0} does not exist")]
    InvalidReference(VersionId),

    /// A branch with this name already exists and the policy rejects overwrites.
    #[error("branch already exists: {0}")]
    DuplicateBranch(BranchName),
}

impl CoreError {
    /// Stable snake_case code for the wire protocol.
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::Forbidden { .. } => "forbidden",
            CoreError::NotFound(_) => "not_found",
            CoreError::BranchNotFound(_) => "branch_not_found",
            CoreError::InvalidReference(_) => "invalid_reference",
            CoreError::DuplicateBranch(_) => "duplicate_branch",
        }
    }

    /// Whether this error is a permission denial.
    pub fn is_forbidden(&self) -> bool {
        matches!(self, CoreError::Forbidden { .. })
    }

    /// Whether this error reports a missing document or branch.
    pub fn is_not_found(&self) -> bool {
        matches!(self, CoreError::NotFound(_) | CoreError::BranchNotFound(_))
    }

    /// Whether retrying the same request could succeed without any other
    /// change. Every core error follows from the request and the document
    /// state, so this is always `false`.
    pub fn is_transient(&self) -> bool {
        match self {
            CoreError::Forbidden { .. }
            | CoreError::NotFound(_)
            | CoreError::BranchNotFound(_)
            | CoreError::InvalidReference(_)
            | CoreError::DuplicateBranch(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forbidden_names_user_and_permission() {
        let err = CoreError::Forbidden {
            document: DocumentId::generate(),
            user: UserId::new("u2").unwrap(),
            permission: Permission::Write,
        };
        let msg = err.to_string();
        assert!(msg.contains("u2"));
        assert!(msg.contains("write"));
        assert!(err.is_forbidden());
        assert!(!err.is_not_found());
    }

    #[test]
    fn no_core_error_is_transient() {
        let errors = [
            CoreError::Forbidden {
                document: DocumentId::generate(),
                user: UserId::new("u2").unwrap(),
                permission: Permission::Read,
            },
            CoreError::NotFound(DocumentId::generate()),
            CoreError::BranchNotFound(BranchName::master()),
            CoreError::InvalidReference(VersionId::new(9)),
            CoreError::DuplicateBranch(BranchName::master()),
        ];
        for err in errors {
            assert!(!err.is_transient(), "{err}");
        }
    }

    #[test]
    fn codes_are_distinct() {
        let errors = [
            CoreError::NotFound(DocumentId::generate()),
            CoreError::BranchNotFound(BranchName::master()),
            CoreError::InvalidReference(VersionId::new(9)),
            CoreError::DuplicateBranch(BranchName::master()),
        ];
        let codes: std::collections::BTreeSet<_> = errors.iter().map(CoreError::code).collect();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn not_found_classification() {
        assert!(CoreError::NotFound(DocumentId::generate()).is_not_found());
        assert!(CoreError::BranchNotFound(BranchName::master()).is_not_found());
        assert!(!CoreError::InvalidReference(VersionId::INITIAL).is_not_found());
    }
}
