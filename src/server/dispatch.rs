//! server::dispatch
//!
//! Route one decoded [`ClientMessage`] to the session coordinator.
//!
//! Returns the direct reply for the sender, if any. Session operations that
//! fan out (join, edits, saves) deliver through the outbox themselves and
//! return `None`.

use tracing::debug;

use super::protocol::ClientMessage;
use crate::session::{Connection, ServerEvent, SessionCoordinator, SessionError};

/// Handle `message` on behalf of `conn`.
///
/// # Errors
///
/// Any [`SessionError`]; the caller reports it to the sender only.
pub async fn dispatch(
    coordinator: &SessionCoordinator,
    conn: &mut Connection,
    message: ClientMessage,
) -> Result<Option<ServerEvent>, SessionError> {
    debug!(conn = %conn.id(), kind = message.kind(), "dispatching");
    let engine = coordinator.engine();

    let reply = match message {
        ClientMessage::Authenticate { token } => {
            let user_id = coordinator.authenticate(conn, &token).await?;
            Some(ServerEvent::Authenticated { user_id })
        }
        ClientMessage::JoinDocument { document_id } => {
            coordinator.join(conn, document_id)?;
            None
        }
        ClientMessage::TextChange { document_id, delta } => {
            coordinator.broadcast_edit(conn, document_id, delta)?;
            None
        }
        ClientMessage::SaveVersion {
            document_id,
            content_ref,
            message,
        } => {
            coordinator.save_version(conn, document_id, content_ref, message)?;
            None
        }
        ClientMessage::LeaveDocument => {
            coordinator.identity(conn)?;
            Some(ServerEvent::Left {
                document_id: coordinator.leave(conn),
            })
        }
        ClientMessage::CreateDocument { title, content_ref } => {
            let user = coordinator.identity(conn)?;
            Some(ServerEvent::DocumentCreated {
                document: engine.create_document(&user, title, content_ref),
            })
        }
        ClientMessage::GetDocument { document_id } => {
            let user = coordinator.identity(conn)?;
            Some(ServerEvent::DocumentData(
                engine.get_document(document_id, &user)?,
            ))
        }
        ClientMessage::UpdateDocument {
            document_id,
            content_ref,
        } => {
            let user = coordinator.identity(conn)?;
            Some(ServerEvent::DocumentUpdated {
                document: engine.update_document_pointer(document_id, &user, content_ref)?,
            })
        }
        ClientMessage::CreateBranch {
            document_id,
            branch_name,
            from_version,
        } => {
            let user = coordinator.identity(conn)?;
            let branch = engine.create_branch(document_id, &user, branch_name, from_version)?;
            Some(ServerEvent::BranchCreated {
                document_id,
                branch,
            })
        }
        ClientMessage::SwitchBranch {
            document_id,
            branch_name,
        } => {
            let user = coordinator.identity(conn)?;
            let version = engine.switch_branch(document_id, &user, &branch_name)?;
            Some(ServerEvent::BranchSwitched {
                document_id,
                version,
            })
        }
        ClientMessage::MergeBranch {
            document_id,
            from_branch,
        } => {
            let user = coordinator.identity(conn)?;
            let version = engine.merge_branch(document_id, &user, &from_branch)?;
            Some(ServerEvent::Merged {
                document_id,
                merged: true,
                version,
            })
        }
        ClientMessage::AddCollaborator {
            document_id,
            collaborator_id,
            permissions,
        } => {
            let user = coordinator.identity(conn)?;
            engine.add_collaborator(document_id, &user, collaborator_id.clone(), permissions)?;
            Some(ServerEvent::CollaboratorAdded {
                document_id,
                collaborator_id,
            })
        }
    };
    Ok(reply)
}
