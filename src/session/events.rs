//! session::events
//!
//! Events delivered to a connection's outbox.
//!
//! Serialized internally tagged by `"type"` with camelCase names, so a
//! version broadcast reads `{"type":"versionSaved","documentId":..,"version":{..}}`.

use serde::{Deserialize, Serialize};

use crate::core::graph::{Branch, Version};
use crate::core::types::{DocumentId, UserId};
use crate::core::view::{DocumentSummary, DocumentView};

/// An event pushed to one participant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    /// The connection's token was accepted.
    Authenticated { user_id: UserId },

    /// Reply to a create request.
    DocumentCreated { document: DocumentSummary },

    /// Snapshot sent to a joining participant, or in reply to a get request.
    DocumentData(DocumentView),

    /// Reply to a content pointer update.
    DocumentUpdated { document: DocumentSummary },

    /// Reply to a branch creation.
    BranchCreated { document_id: DocumentId, branch: Branch },

    /// Reply to a branch switch, carrying the new head.
    BranchSwitched { document_id: DocumentId, version: Version },

    /// Reply to a merge.
    Merged {
        document_id: DocumentId,
        merged: bool,
        version: Version,
    },

    /// Reply to a collaborator grant.
    CollaboratorAdded {
        document_id: DocumentId,
        collaborator_id: UserId,
    },

    /// A live edit from another participant.
    TextChange {
        document_id: DocumentId,
        delta: serde_json::Value,
        user_id: UserId,
    },

    /// A version committed to a document this connection has joined.
    VersionSaved { document_id: DocumentId, version: Version },

    /// Reply to an explicit leave.
    Left { document_id: Option<DocumentId> },

    /// A request from this connection failed.
    Error { code: String, message: String },
}

impl ServerEvent {
    /// Build an error event from a code and any displayable error.
    pub fn error(code: &str, err: impl std::fmt::Display) -> Self {
        ServerEvent::Error {
            code: code.to_string(),
            message: err.to_string(),
        }
    }

    /// Whether this is an error event.
    pub fn is_error(&self) -> bool {
        matches!(self, ServerEvent::Error { .. })
    }
}
