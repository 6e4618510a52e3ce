//! core::verify
//!
//! Structural verification of a document's version graph.
//!
//! # Checks
//!
//! - Version ids are dense and in creation order (`versions[i].id == i`)
//! - Every branch's `version_ids` is non-empty, strictly increasing, and
//!   references existing versions
//! - Every branch's `head` is the last element of its `version_ids`
//! - The current branch name is not duplicated in the other branches
//!
//! # Invariants
//!
//! - Never mutates the document
//! - Deterministic: reports the first violation found, branches in name order

use thiserror::Error;

use super::graph::{Branch, Document};
use super::types::{BranchName, VersionId};

/// A broken graph invariant. Always a programming error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    #[error("document has no versions")]
    NoVersions,

    #[error("version at position {position} has id {found}")]
    VersionOutOfOrder { position: usize, found: VersionId },

    #[error("current branch '{0}' does not exist")]
    CurrentBranchMissing(BranchName),

    #[error("branch '{0}' is stored twice")]
    DuplicateBranchEntry(BranchName),

    #[error("branch '{0}' has an empty history")]
    EmptyBranch(BranchName),

    #[error("branch '{branch}' head {head} is not its last version")]
    HeadNotLast { branch: BranchName, head: VersionId },

    #[error("branch '{branch}' references missing version {version}")]
    DanglingVersion { branch: BranchName, version: VersionId },

    #[error("branch '{0}' history is not in creation order")]
    BranchOutOfOrder(BranchName),
}

/// Verify every invariant of `doc`.
///
/// # Errors
///
/// Returns the first [`InvariantViolation`] found.
pub fn verify(doc: &Document) -> Result<(), InvariantViolation> {
    if doc.versions().is_empty() {
        return Err(InvariantViolation::NoVersions);
    }
    for (position, version) in doc.versions().iter().enumerate() {
        if version.id().get() != position as u64 {
            return Err(InvariantViolation::VersionOutOfOrder {
                position,
                found: version.id(),
            });
        }
    }

    let current = doc.current_branch().name();
    if doc.branches().skip(1).any(|b| b.name() == current) {
        return Err(InvariantViolation::DuplicateBranchEntry(current.clone()));
    }

    for branch in doc.branches() {
        verify_branch(doc, branch)?;
    }
    Ok(())
}

fn verify_branch(doc: &Document, branch: &Branch) -> Result<(), InvariantViolation> {
    let ids = branch.version_ids();
    let Some(&last) = ids.last() else {
        return Err(InvariantViolation::EmptyBranch(branch.name().clone()));
    };
    if last != branch.head() {
        return Err(InvariantViolation::HeadNotLast {
            branch: branch.name().clone(),
            head: branch.head(),
        });
    }
    if ids.windows(2).any(|pair| pair[0] >= pair[1]) {
        return Err(InvariantViolation::BranchOutOfOrder(branch.name().clone()));
    }
    if let Some(&missing) = ids.iter().find(|id| doc.version(**id).is_none()) {
        return Err(InvariantViolation::DanglingVersion {
            branch: branch.name().clone(),
            version: missing,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::graph::BranchPolicy;
    use crate::core::types::{ContentRef, DocumentId, UserId};

    fn doc() -> Document {
        Document::new(
            DocumentId::generate(),
            "t",
            ContentRef::default(),
            UserId::new("owner").unwrap(),
        )
    }

    #[test]
    fn fresh_document_verifies() {
        assert!(verify(&doc()).is_ok());
    }

    #[test]
    fn branched_document_verifies() {
        let mut d = doc();
        let owner = UserId::new("owner").unwrap();
        d.add_version(ContentRef::new("a"), owner.clone(), "a");
        d.create_branch(
            BranchName::new("side").unwrap(),
            Some(VersionId::INITIAL),
            BranchPolicy::Reject,
        )
        .unwrap();
        d.merge(&BranchName::new("side").unwrap(), owner).unwrap();
        assert!(verify(&d).is_ok());
    }

    fn tampered(mutate: impl FnOnce(&mut serde_json::Value)) -> String {
        let mut json = serde_json::to_value(doc()).unwrap();
        mutate(&mut json);
        serde_json::from_value::<Document>(json)
            .unwrap_err()
            .to_string()
    }

    #[test]
    fn head_not_last_detected() {
        let msg = tampered(|j| j["branches"]["master"]["head"] = 5.into());
        assert!(msg.contains("head"), "{msg}");
    }

    #[test]
    fn dangling_version_detected() {
        let msg = tampered(|j| {
            j["branches"]["master"]["versionIds"] = serde_json::json!([0, 3]);
            j["branches"]["master"]["head"] = 3.into();
        });
        assert!(msg.contains("missing version"), "{msg}");
    }

    #[test]
    fn empty_branch_detected() {
        let msg = tampered(|j| j["branches"]["master"]["versionIds"] = serde_json::json!([]));
        assert!(msg.contains("empty history"), "{msg}");
    }

    #[test]
    fn out_of_order_versions_detected() {
        let msg = tampered(|j| j["versions"][0]["id"] = 7.into());
        assert!(msg.contains("position 0"), "{msg}");
    }
}
