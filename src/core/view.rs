//! core::view
//!
//! Read-only projections of a document handed across the core boundary.

use serde::{Deserialize, Serialize};

use super::graph::Version;
use super::types::{BranchName, ContentRef, DocumentId, UserId};

/// What a participant sees when opening a document.
///
/// Carries the caller's own permission flags, never the collaborator list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentView {
    pub id: DocumentId,
    pub title: String,
    pub content_ref: ContentRef,
    pub current_branch: BranchName,
    pub versions: Vec<Version>,
    pub can_edit: bool,
    pub can_admin: bool,
}

/// Short description of a document, returned by create and update requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSummary {
    pub id: DocumentId,
    pub title: String,
    pub owner_id: UserId,
    pub content_ref: ContentRef,
    pub current_branch: BranchName,
    pub version_count: usize,
}
