//! core::graph
//!
//! The version graph of a single document.
//!
//! # Architecture
//!
//! A [`Document`] owns an append-only list of [`Version`]s and a set of named
//! [`Branch`]es pointing into it. Version ids are allocated sequentially, so a
//! version's id is also its position in creation order.
//!
//! The current branch is held outside the map of other branches. Looking it
//! up can therefore never fail, and switching branches is a swap.
//!
//! # Invariants
//!
//! - `current_branch` always names an existing branch
//! - `versions` never shrinks; `versions[i].id == i`
//! - every branch's `head` is the last element of its `version_ids`
//! - every branch's `version_ids` are strictly increasing and exist
//!
//! All mutation goes through the methods in this module. Each one re-checks
//! the invariants with [`super::verify`] in debug builds.
//!
//! # Example
//!
//! ```
//! use collabdoc::core::graph::{BranchPolicy, Document};
//! use collabdoc::core::types::{BranchName, ContentRef, DocumentId, UserId};
//!
//! let owner = UserId::new("u1").unwrap();
//! let mut doc = Document::new(DocumentId::generate(), "Spec", ContentRef::new("cid-0"), owner.clone());
//! let v1 = doc.add_version(ContentRef::new("cid-1"), owner.clone(), "v1");
//!
//! let feature = BranchName::new("feature").unwrap();
//! doc.create_branch(feature.clone(), None, BranchPolicy::Reject).unwrap();
//! let head = doc.switch_branch(&feature).unwrap();
//! assert_eq!(head.id(), v1.id());
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::access::has_permission;
use super::errors::CoreError;
use super::types::{
    BranchName, ContentRef, DocumentId, Permission, PermissionSet, UserId, UtcTimestamp,
    VersionId,
};
use super::verify::{verify, InvariantViolation};
use super::view::{DocumentSummary, DocumentView};

/// Message recorded on the version a document is created with.
pub const INITIAL_VERSION_MESSAGE: &str = "Initial version";

/// How `create_branch` treats a name that already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BranchPolicy {
    /// Fail with [`CoreError::DuplicateBranch`].
    #[default]
    Reject,
    /// Replace the existing branch.
    Overwrite,
}

/// An immutable snapshot record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Version {
    id: VersionId,
    content_ref: ContentRef,
    timestamp: UtcTimestamp,
    author_id: UserId,
    message: String,
}

impl Version {
    pub fn id(&self) -> VersionId {
        self.id
    }

    pub fn content_ref(&self) -> &ContentRef {
        &self.content_ref
    }

    pub fn timestamp(&self) -> &UtcTimestamp {
        &self.timestamp
    }

    pub fn author_id(&self) -> &UserId {
        &self.author_id
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// A named pointer into the version history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Branch {
    name: BranchName,
    head: VersionId,
    version_ids: Vec<VersionId>,
}

impl Branch {
    fn root(name: BranchName, version: VersionId) -> Self {
        Self {
            name,
            head: version,
            version_ids: vec![version],
        }
    }

    fn push(&mut self, version: VersionId) {
        self.version_ids.push(version);
        self.head = version;
    }

    pub fn name(&self) -> &BranchName {
        &self.name
    }

    pub fn head(&self) -> VersionId {
        self.head
    }

    /// Version ids on this branch, oldest first.
    pub fn version_ids(&self) -> &[VersionId] {
        &self.version_ids
    }
}

/// The aggregate root: metadata, access list, and version graph of a document.
///
/// Serializes as the flat record layout (`branches` includes the current
/// branch); deserialization re-validates every invariant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "DocumentRecord", try_from = "DocumentRecord")]
pub struct Document {
    id: DocumentId,
    title: String,
    owner_id: UserId,
    collaborators: BTreeMap<UserId, PermissionSet>,
    current: Branch,
    other_branches: BTreeMap<BranchName, Branch>,
    versions: Vec<Version>,
    content_ref: ContentRef,
}

impl Document {
    /// Create a document with one initial version on `master`.
    pub fn new(
        id: DocumentId,
        title: impl Into<String>,
        content_ref: ContentRef,
        owner_id: UserId,
    ) -> Self {
        let initial = Version {
            id: VersionId::INITIAL,
            content_ref: content_ref.clone(),
            timestamp: UtcTimestamp::now(),
            author_id: owner_id.clone(),
            message: INITIAL_VERSION_MESSAGE.to_string(),
        };
        Self {
            id,
            title: title.into(),
            owner_id,
            collaborators: BTreeMap::new(),
            current: Branch::root(BranchName::master(), initial.id),
            other_branches: BTreeMap::new(),
            versions: vec![initial],
            content_ref,
        }
    }

    pub fn id(&self) -> DocumentId {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn owner_id(&self) -> &UserId {
        &self.owner_id
    }

    pub fn collaborators(&self) -> &BTreeMap<UserId, PermissionSet> {
        &self.collaborators
    }

    /// The content reference most recently made current.
    pub fn content_ref(&self) -> &ContentRef {
        &self.content_ref
    }

    /// Every version ever created, in creation order.
    pub fn versions(&self) -> &[Version] {
        &self.versions
    }

    /// Look up a version by id.
    pub fn version(&self, id: VersionId) -> Option<&Version> {
        self.versions.get(id.index()).filter(|v| v.id == id)
    }

    /// The branch newly joining participants see.
    pub fn current_branch(&self) -> &Branch {
        &self.current
    }

    /// Look up a branch by name.
    pub fn branch(&self, name: &BranchName) -> Option<&Branch> {
        if &self.current.name == name {
            Some(&self.current)
        } else {
            self.other_branches.get(name)
        }
    }

    /// All branches, current first, then the rest by name.
    pub fn branches(&self) -> impl Iterator<Item = &Branch> {
        std::iter::once(&self.current).chain(self.other_branches.values())
    }

    fn next_version_id(&self) -> VersionId {
        self.versions
            .last()
            .map_or(VersionId::INITIAL, |v| v.id.next())
    }

    fn resolve(&self, id: VersionId) -> Result<&Version, CoreError> {
        self.version(id).ok_or(CoreError::InvalidReference(id))
    }

    /// Append a version to the current branch and make it current content.
    pub fn add_version(
        &mut self,
        content_ref: ContentRef,
        author_id: UserId,
        message: impl Into<String>,
    ) -> Version {
        let version = Version {
            id: self.next_version_id(),
            content_ref,
            timestamp: UtcTimestamp::now(),
            author_id,
            message: message.into(),
        };
        self.versions.push(version.clone());
        self.current.push(version.id);
        self.content_ref = version.content_ref.clone();
        self.debug_check();
        version
    }

    /// Create a branch whose history is every version up to `from`.
    ///
    /// `from` defaults to the current head. The new branch's `version_ids` is
    /// the prefix of the global creation order ending at `from`, which may
    /// include versions never reachable from the current branch.
    ///
    /// # Errors
    ///
    /// - [`CoreError::InvalidReference`] if `from` does not exist
    /// - [`CoreError::DuplicateBranch`] if `name` exists and `policy` is `Reject`
    pub fn create_branch(
        &mut self,
        name: BranchName,
        from: Option<VersionId>,
        policy: BranchPolicy,
    ) -> Result<Branch, CoreError> {
        let from = from.unwrap_or(self.current.head);
        self.resolve(from)?;

        if self.branch(&name).is_some() && policy == BranchPolicy::Reject {
            return Err(CoreError::DuplicateBranch(name));
        }

        let branch = Branch {
            name: name.clone(),
            head: from,
            version_ids: self.versions[..=from.index()].iter().map(|v| v.id).collect(),
        };

        if self.current.name == name {
            self.current = branch.clone();
        } else {
            self.other_branches.insert(name, branch.clone());
        }
        self.debug_check();
        Ok(branch)
    }

    /// Make `name` the current branch and return its head version.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::BranchNotFound`] if `name` does not exist.
    pub fn switch_branch(&mut self, name: &BranchName) -> Result<Version, CoreError> {
        if &self.current.name != name {
            let target = self
                .other_branches
                .remove(name)
                .ok_or_else(|| CoreError::BranchNotFound(name.clone()))?;
            let previous = std::mem::replace(&mut self.current, target);
            self.other_branches.insert(previous.name.clone(), previous);
        }

        let head = self.resolve(self.current.head)?.clone();
        self.content_ref = head.content_ref.clone();
        self.debug_check();
        Ok(head)
    }

    /// Fast-forward merge: copy `from`'s head content into a new version on
    /// the current branch. `from` itself is left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::BranchNotFound`] if `from` does not exist.
    pub fn merge(&mut self, from: &BranchName, author_id: UserId) -> Result<Version, CoreError> {
        let head = self
            .branch(from)
            .map(Branch::head)
            .ok_or_else(|| CoreError::BranchNotFound(from.clone()))?;
        let content_ref = self.resolve(head)?.content_ref.clone();
        Ok(self.add_version(content_ref, author_id, format!("Merged from {from}")))
    }

    /// Grant `permissions` to `user`, replacing any previous grant.
    pub fn add_collaborator(&mut self, user: UserId, permissions: PermissionSet) {
        self.collaborators.insert(user, permissions);
    }

    /// Overwrite the current content pointer without recording a version.
    pub fn set_content_ref(&mut self, content_ref: ContentRef) {
        self.content_ref = content_ref;
    }

    /// The view of this document presented to `user`.
    pub fn metadata_for(&self, user: &UserId) -> DocumentView {
        DocumentView {
            id: self.id,
            title: self.title.clone(),
            content_ref: self.content_ref.clone(),
            current_branch: self.current.name.clone(),
            versions: self.versions.clone(),
            can_edit: has_permission(self, user, Permission::Write),
            can_admin: has_permission(self, user, Permission::Admin),
        }
    }

    /// A short description of the document, without history.
    pub fn summary(&self) -> DocumentSummary {
        DocumentSummary {
            id: self.id,
            title: self.title.clone(),
            owner_id: self.owner_id.clone(),
            content_ref: self.content_ref.clone(),
            current_branch: self.current.name.clone(),
            version_count: self.versions.len(),
        }
    }

    fn debug_check(&self) {
        if cfg!(debug_assertions) {
            if let Err(violation) = verify(self) {
                panic!("document {} violates an invariant: {violation}", self.id);
            }
        }
    }
}

/// Flat persisted layout of a [`Document`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DocumentRecord {
    id: DocumentId,
    title: String,
    owner_id: UserId,
    collaborators: BTreeMap<UserId, PermissionSet>,
    branches: BTreeMap<BranchName, BranchRecord>,
    current_branch: BranchName,
    versions: Vec<Version>,
    content_ref: ContentRef,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BranchRecord {
    head: VersionId,
    version_ids: Vec<VersionId>,
}

impl From<Document> for DocumentRecord {
    fn from(doc: Document) -> Self {
        let current_branch = doc.current.name.clone();
        let branches = std::iter::once(doc.current)
            .chain(doc.other_branches.into_values())
            .map(|b| {
                (
                    b.name,
                    BranchRecord {
                        head: b.head,
                        version_ids: b.version_ids,
                    },
                )
            })
            .collect();
        Self {
            id: doc.id,
            title: doc.title,
            owner_id: doc.owner_id,
            collaborators: doc.collaborators,
            branches,
            current_branch,
            versions: doc.versions,
            content_ref: doc.content_ref,
        }
    }
}

impl TryFrom<DocumentRecord> for Document {
    type Error = InvariantViolation;

    fn try_from(mut record: DocumentRecord) -> Result<Self, Self::Error> {
        let mut other_branches: BTreeMap<BranchName, Branch> = std::mem::take(&mut record.branches)
            .into_iter()
            .map(|(name, b)| {
                let branch = Branch {
                    name: name.clone(),
                    head: b.head,
                    version_ids: b.version_ids,
                };
                (name, branch)
            })
            .collect();
        let current = other_branches
            .remove(&record.current_branch)
            .ok_or_else(|| InvariantViolation::CurrentBranchMissing(record.current_branch.clone()))?;

        let doc = Document {
            id: record.id,
            title: record.title,
            owner_id: record.owner_id,
            collaborators: record.collaborators,
            current,
            other_branches,
            versions: record.versions,
            content_ref: record.content_ref,
        };
        verify(&doc)?;
        Ok(doc)
    }
}
