//! engine
//!
//! Gated request operations over the document registry.
//!
//! # Architecture
//!
//! Every operation follows the same lifecycle:
//!
//! ```text
//! Resolve -> Lock -> Gate -> Mutate -> Notify -> Unlock
//! ```
//!
//! 1. **Resolve**: look the document up in the [`DocumentRegistry`]
//! 2. **Lock**: take that document's lock (other documents are unaffected)
//! 3. **Gate**: check the operation's [`RequirementSet`]
//! 4. **Mutate**: call the version graph operation
//! 5. **Notify**: hand new versions to the [`VersionObserver`], still under
//!    the lock so observers see commit order
//!
//! # Invariants
//!
//! - No operation mutates a document before gating succeeds
//! - Nothing inside the lock waits on I/O
//! - Errors are returned to the caller and never poison other documents
//!
//! # Example
//!
//! ```
//! use collabdoc::core::registry::DocumentRegistry;
//! use collabdoc::core::types::{BranchName, ContentRef, UserId};
//! use collabdoc::engine::{Engine, EngineSettings};
//! use std::sync::Arc;
//!
//! let engine = Engine::new(Arc::new(DocumentRegistry::new()), EngineSettings::default());
//! let owner = UserId::new("u1").unwrap();
//! let doc = engine.create_document(&owner, "Spec", ContentRef::new("cid-0"));
//!
//! let feature = BranchName::new("feature").unwrap();
//! engine.create_branch(doc.id, &owner, feature.clone(), None).unwrap();
//! engine.switch_branch(doc.id, &owner, &feature).unwrap();
//! ```

pub mod gate;
pub mod hooks;

pub use gate::{gate, requirements, RequirementSet};
pub use hooks::VersionObserver;

use std::sync::Arc;

use tracing::{debug, info};

use crate::core::config::Config;
use crate::core::errors::CoreError;
use crate::core::graph::{Branch, BranchPolicy, Document, Version};
use crate::core::registry::{lock_document, DocumentRegistry};
use crate::core::types::{BranchName, ContentRef, DocumentId, PermissionSet, UserId, VersionId};
use crate::core::view::{DocumentSummary, DocumentView};

/// Behavior knobs taken from configuration.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// What `create_branch` does with an existing name.
    pub duplicate_branch: BranchPolicy,
    /// Grant used when `add_collaborator` is given no permissions.
    pub default_permissions: PermissionSet,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl EngineSettings {
    /// Extract engine settings from loaded configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            duplicate_branch: config.duplicate_branch(),
            default_permissions: config.default_permissions(),
        }
    }
}

/// Request-level entry point to the documents.
pub struct Engine {
    registry: Arc<DocumentRegistry>,
    settings: EngineSettings,
    observer: Option<Arc<dyn VersionObserver>>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("registry", &self.registry)
            .field("settings", &self.settings)
            .field("observer", &self.observer.is_some())
            .finish()
    }
}

impl Engine {
    /// Create an engine over `registry`.
    pub fn new(registry: Arc<DocumentRegistry>, settings: EngineSettings) -> Self {
        Self {
            registry,
            settings,
            observer: None,
        }
    }

    /// Attach an observer for committed versions.
    pub fn with_observer(mut self, observer: Arc<dyn VersionObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// The underlying registry.
    pub fn registry(&self) -> &Arc<DocumentRegistry> {
        &self.registry
    }

    /// Active settings.
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Run `f` on document `id` after gating `user` against `requirement`.
    ///
    /// `f` runs under the document lock and must not block.
    ///
    /// # Errors
    ///
    /// - [`CoreError::NotFound`] if the document does not exist
    /// - [`CoreError::Forbidden`] if gating fails
    pub fn with_permission<R>(
        &self,
        id: DocumentId,
        user: &UserId,
        requirement: &RequirementSet,
        f: impl FnOnce(&mut Document) -> R,
    ) -> Result<R, CoreError> {
        let handle = self.registry.find_by_id(id)?;
        let mut doc = lock_document(&handle);
        if let Err(err) = gate(&doc, user, requirement) {
            debug!(document = %id, user = %user, requirement = requirement.name, "gate denied");
            return Err(err);
        }
        Ok(f(&mut doc))
    }

    fn notify(&self, document: DocumentId, version: &Version) {
        if let Some(observer) = &self.observer {
            observer.version_created(document, version);
        }
    }

    /// Create a document owned by `owner`.
    pub fn create_document(
        &self,
        owner: &UserId,
        title: impl Into<String>,
        content_ref: ContentRef,
    ) -> DocumentSummary {
        let doc = self.registry.create(title, content_ref, owner.clone());
        info!(document = %doc.id(), owner = %owner, "created document");
        doc.summary()
    }

    /// The caller's view of a document. Requires `read`.
    pub fn get_document(&self, id: DocumentId, user: &UserId) -> Result<DocumentView, CoreError> {
        self.with_permission(id, user, &requirements::READ, |doc| doc.metadata_for(user))
    }

    /// Move the current content pointer without recording a version.
    /// Requires `write`.
    pub fn update_document_pointer(
        &self,
        id: DocumentId,
        user: &UserId,
        content_ref: ContentRef,
    ) -> Result<DocumentSummary, CoreError> {
        self.with_permission(id, user, &requirements::WRITE, |doc| {
            doc.set_content_ref(content_ref);
            doc.summary()
        })
    }

    /// Create a branch from `from` (default: current head). Requires `write`.
    pub fn create_branch(
        &self,
        id: DocumentId,
        user: &UserId,
        name: BranchName,
        from: Option<VersionId>,
    ) -> Result<Branch, CoreError> {
        let policy = self.settings.duplicate_branch;
        let branch = self
            .with_permission(id, user, &requirements::WRITE, |doc| {
                doc.create_branch(name, from, policy)
            })??;
        info!(document = %id, user = %user, branch = %branch.name(), head = %branch.head(), "created branch");
        Ok(branch)
    }

    /// Make `name` current and return its head. Requires `read`.
    pub fn switch_branch(
        &self,
        id: DocumentId,
        user: &UserId,
        name: &BranchName,
    ) -> Result<Version, CoreError> {
        let head = self
            .with_permission(id, user, &requirements::READ, |doc| doc.switch_branch(name))??;
        info!(document = %id, user = %user, branch = %name, "switched branch");
        Ok(head)
    }

    /// Fast-forward `from`'s head content onto the current branch.
    /// Requires `write`.
    pub fn merge_branch(
        &self,
        id: DocumentId,
        user: &UserId,
        from: &BranchName,
    ) -> Result<Version, CoreError> {
        let version = self.with_permission(id, user, &requirements::WRITE, |doc| {
            let version = doc.merge(from, user.clone())?;
            self.notify(id, &version);
            Ok::<_, CoreError>(version)
        })??;
        info!(document = %id, user = %user, from = %from, version = %version.id(), "merged branch");
        Ok(version)
    }

    /// Grant `permissions` (or the configured default) to `collaborator`.
    /// Requires `admin`.
    pub fn add_collaborator(
        &self,
        id: DocumentId,
        user: &UserId,
        collaborator: UserId,
        permissions: Option<PermissionSet>,
    ) -> Result<(), CoreError> {
        let permissions = permissions.unwrap_or_else(|| self.settings.default_permissions.clone());
        info!(document = %id, user = %user, collaborator = %collaborator, permissions = %permissions, "adding collaborator");
        self.with_permission(id, user, &requirements::ADMIN, |doc| {
            doc.add_collaborator(collaborator, permissions)
        })
    }

    /// Append a version to the current branch. Requires `write`.
    pub fn save_version(
        &self,
        id: DocumentId,
        user: &UserId,
        content_ref: ContentRef,
        message: impl Into<String>,
    ) -> Result<Version, CoreError> {
        let version = self.with_permission(id, user, &requirements::WRITE, |doc| {
            let version = doc.add_version(content_ref, user.clone(), message);
            self.notify(id, &version);
            version
        })?;
        debug!(document = %id, user = %user, version = %version.id(), "saved version");
        Ok(version)
    }
}
