//! server::protocol
//!
//! Wire messages for the line-delimited JSON transport.
//!
//! Each line a client sends is one [`ClientMessage`]; each line the server
//! sends is one [`ServerEvent`]. Both are tagged by `"type"` with camelCase
//! names and fields:
//!
//! ```text
//! -> {"type":"authenticate","token":"t1"}
//! <- {"type":"authenticated","userId":"u1"}
//! -> {"type":"joinDocument","documentId":"..."}
//! <- {"type":"documentData","id":"...","title":"Notes",...}
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::types::{BranchName, ContentRef, DocumentId, PermissionSet, UserId, VersionId};
use crate::session::ServerEvent;

/// Errors decoding or encoding wire messages.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The line is not a valid client message.
    #[error("malformed message: {0}")]
    Malformed(#[source] serde_json::Error),

    /// The line exceeded the frame limit and was discarded.
    #[error("message exceeds {limit} bytes")]
    FrameTooLong { limit: usize },

    /// An event could not be serialized.
    #[error("failed to encode event: {0}")]
    Encode(#[source] serde_json::Error),
}

impl ProtocolError {
    /// Stable code for error events.
    pub fn code(&self) -> &'static str {
        "protocol_error"
    }

    /// Render as an error event for the sender.
    pub fn to_event(&self) -> ServerEvent {
        ServerEvent::error(self.code(), self)
    }
}

/// A request from a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    /// Present a bearer token. Must come first.
    Authenticate { token: String },

    /// Create a document owned by the caller.
    CreateDocument {
        title: String,
        #[serde(default)]
        content_ref: ContentRef,
    },

    /// Fetch the caller's view of a document.
    GetDocument { document_id: DocumentId },

    /// Move the content pointer without recording a version.
    UpdateDocument {
        document_id: DocumentId,
        content_ref: ContentRef,
    },

    /// Create a branch, from the current head unless `fromVersion` is given.
    CreateBranch {
        document_id: DocumentId,
        branch_name: BranchName,
        #[serde(default)]
        from_version: Option<VersionId>,
    },

    /// Make a branch current.
    SwitchBranch {
        document_id: DocumentId,
        branch_name: BranchName,
    },

    /// Fast-forward another branch's head content onto the current branch.
    MergeBranch {
        document_id: DocumentId,
        from_branch: BranchName,
    },

    /// Grant permissions to a collaborator.
    AddCollaborator {
        document_id: DocumentId,
        collaborator_id: UserId,
        #[serde(default)]
        permissions: Option<PermissionSet>,
    },

    /// Join a document's live session.
    JoinDocument { document_id: DocumentId },

    /// Relay an opaque edit to the other participants.
    TextChange {
        document_id: DocumentId,
        delta: serde_json::Value,
    },

    /// Commit a version and broadcast it.
    SaveVersion {
        document_id: DocumentId,
        content_ref: ContentRef,
        #[serde(default)]
        message: String,
    },

    /// Leave the current live session.
    LeaveDocument,
}

impl ClientMessage {
    /// Decode one line.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Malformed`] if the line is not a known message.
    pub fn parse(line: &str) -> Result<Self, ProtocolError> {
        Self::parse_bytes(line.as_bytes())
    }

    /// Decode one raw line. Invalid UTF-8 is malformed, like any other
    /// JSON error.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Malformed`] if the line is not a known message.
    pub fn parse_bytes(line: &[u8]) -> Result<Self, ProtocolError> {
        serde_json::from_slice(line).map_err(ProtocolError::Malformed)
    }

    /// Wire name of this message, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            ClientMessage::Authenticate { .. } => "authenticate",
            ClientMessage::CreateDocument { .. } => "createDocument",
            ClientMessage::GetDocument { .. } => "getDocument",
            ClientMessage::UpdateDocument { .. } => "updateDocument",
            ClientMessage::CreateBranch { .. } => "createBranch",
            ClientMessage::SwitchBranch { .. } => "switchBranch",
            ClientMessage::MergeBranch { .. } => "mergeBranch",
            ClientMessage::AddCollaborator { .. } => "addCollaborator",
            ClientMessage::JoinDocument { .. } => "joinDocument",
            ClientMessage::TextChange { .. } => "textChange",
            ClientMessage::SaveVersion { .. } => "saveVersion",
            ClientMessage::LeaveDocument => "leaveDocument",
        }
    }
}

/// Encode one event as a line, without the trailing newline.
///
/// # Errors
///
/// Returns [`ProtocolError::Encode`] if serialization fails.
pub fn encode_event(event: &ServerEvent) -> Result<String, ProtocolError> {
    serde_json::to_string(event).map_err(ProtocolError::Encode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Permission;

    #[test]
    fn parses_camel_case_requests() {
        let id = DocumentId::generate();
        let line = format!(
            r#"{{"type":"createBranch","documentId":"{id}","branchName":"feature","fromVersion":0}}"#
        );
        assert_eq!(
            ClientMessage::parse(&line).unwrap(),
            ClientMessage::CreateBranch {
                document_id: id,
                branch_name: BranchName::new("feature").unwrap(),
                from_version: Some(VersionId::INITIAL),
            }
        );
    }

    #[test]
    fn optional_fields_default() {
        let msg = ClientMessage::parse(r#"{"type":"createDocument","title":"Notes"}"#).unwrap();
        assert_eq!(
            msg,
            ClientMessage::CreateDocument {
                title: "Notes".into(),
                content_ref: ContentRef::default(),
            }
        );
    }

    #[test]
    fn permissions_parse_as_set() {
        let id = DocumentId::generate();
        let line = format!(
            r#"{{"type":"addCollaborator","documentId":"{id}","collaboratorId":"u2","permissions":["write","read","write"]}}"#
        );
        let ClientMessage::AddCollaborator { permissions, .. } = ClientMessage::parse(&line).unwrap()
        else {
            panic!("wrong variant");
        };
        let permissions = permissions.unwrap();
        assert!(permissions.contains(Permission::Read));
        assert!(permissions.contains(Permission::Write));
        assert!(!permissions.contains(Permission::Admin));
    }

    #[test]
    fn invalid_branch_name_is_malformed() {
        let id = DocumentId::generate();
        let line = format!(r#"{{"type":"switchBranch","documentId":"{id}","branchName":"a b"}}"#);
        let err = ClientMessage::parse(&line).unwrap_err();
        assert_eq!(err.code(), "protocol_error");
    }

    #[test]
    fn unknown_type_and_garbage_are_malformed() {
        assert!(ClientMessage::parse(r#"{"type":"dropTables"}"#).is_err());
        assert!(ClientMessage::parse("not json").is_err());
        assert!(ClientMessage::parse(r#"{"type":"getDocument","documentId":"nope"}"#).is_err());
    }

    #[test]
    fn invalid_utf8_is_malformed() {
        let err = ClientMessage::parse_bytes(b"{\"type\":\"authenticate\",\"token\":\"\xff\xfe\"}")
            .unwrap_err();
        assert!(matches!(err, ProtocolError::Malformed(_)));
        assert_eq!(err.code(), "protocol_error");
    }

    #[test]
    fn frame_too_long_is_a_protocol_error() {
        let err = ProtocolError::FrameTooLong { limit: 16 };
        assert_eq!(err.code(), "protocol_error");
        assert!(err.to_string().contains("16"));
    }

    #[test]
    fn kind_matches_wire_tag() {
        let msg = ClientMessage::LeaveDocument;
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], msg.kind());
    }
}
