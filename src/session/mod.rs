//! session
//!
//! Live editing sessions: connection lifecycle, live edits, and fan-out.
//!
//! # Architecture
//!
//! The [`SessionCoordinator`] owns the [`Engine`] and the [`FanoutGroups`].
//! The groups are registered as the engine's version observer, so every
//! committed version (save or merge) is broadcast to the document's group
//! from inside the document lock.
//!
//! Live edits are relayed, not applied: the delta is opaque and nothing in
//! the version graph changes.
//!
//! # Ordering
//!
//! Joins, edits, and version broadcasts for one document all enqueue while
//! holding that document's lock. Two participants in the same group therefore
//! receive the same events in the same order. Events for different documents
//! are not ordered relative to each other.
//!
//! # Example
//!
//! ```
//! use collabdoc::auth::StaticTokenProvider;
//! use collabdoc::core::registry::DocumentRegistry;
//! use collabdoc::core::types::ContentRef;
//! use collabdoc::engine::EngineSettings;
//! use collabdoc::session::{ServerEvent, SessionCoordinator};
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let auth = StaticTokenProvider::from_pairs([("t1", "u1")]).unwrap();
//! let coordinator = SessionCoordinator::new(
//!     Arc::new(DocumentRegistry::new()),
//!     EngineSettings::default(),
//!     Arc::new(auth),
//! );
//!
//! let (mut conn, mut events) = coordinator.connect();
//! let user = coordinator.authenticate(&mut conn, "t1").await.unwrap();
//! let doc = coordinator.engine().create_document(&user, "Notes", ContentRef::new("c0"));
//!
//! coordinator.join(&mut conn, doc.id).unwrap();
//! assert!(matches!(events.try_recv().unwrap(), ServerEvent::DocumentData(_)));
//! # });
//! ```

mod connection;
mod events;
mod fanout;

pub use connection::{Connection, ConnectionId, ConnectionState};
pub use events::ServerEvent;
pub use fanout::{Delivery, FanoutGroups, Outbox};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::auth::{AuthError, AuthProvider};
use crate::core::config::DEFAULT_OUTBOX_CAPACITY;
use crate::core::errors::CoreError;
use crate::core::graph::Version;
use crate::core::registry::DocumentRegistry;
use crate::core::types::{ContentRef, DocumentId, UserId};
use crate::engine::{requirements, Engine, EngineSettings};

/// Errors from session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The document operation failed.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Authentication failed or is missing.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// The connection is not joined to the named document.
    #[error("not joined to document {0}")]
    NotJoined(DocumentId),

    /// The connection has been closed.
    #[error("connection is disconnected")]
    Disconnected,
}

impl SessionError {
    /// Stable machine-readable code for error events.
    pub fn code(&self) -> &'static str {
        match self {
            SessionError::Core(err) => err.code(),
            SessionError::Auth(err) => err.code(),
            SessionError::NotJoined(_) => "not_joined",
            SessionError::Disconnected => "disconnected",
        }
    }

    /// Render as an error event for the sender.
    pub fn to_event(&self) -> ServerEvent {
        ServerEvent::error(self.code(), self)
    }
}

/// Coordinates live sessions over shared documents.
pub struct SessionCoordinator {
    engine: Engine,
    groups: Arc<FanoutGroups>,
    auth: Arc<dyn AuthProvider>,
    outbox_capacity: usize,
    next_connection: AtomicU64,
}

impl std::fmt::Debug for SessionCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCoordinator")
            .field("engine", &self.engine)
            .field("groups", &self.groups)
            .field("outbox_capacity", &self.outbox_capacity)
            .finish_non_exhaustive()
    }
}

impl SessionCoordinator {
    /// Create a coordinator over `registry`, verifying tokens with `auth`.
    pub fn new(
        registry: Arc<DocumentRegistry>,
        settings: EngineSettings,
        auth: Arc<dyn AuthProvider>,
    ) -> Self {
        let groups = Arc::new(FanoutGroups::new());
        let engine = Engine::new(registry, settings).with_observer(groups.clone());
        Self {
            engine,
            groups,
            auth,
            outbox_capacity: DEFAULT_OUTBOX_CAPACITY,
            next_connection: AtomicU64::new(1),
        }
    }

    /// Cap each connection's queue of undelivered events at `capacity`.
    /// A connection that falls further behind is evicted from its group.
    pub fn with_outbox_capacity(mut self, capacity: usize) -> Self {
        self.outbox_capacity = capacity.max(1);
        self
    }

    /// The request-level engine, for non-session operations.
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// The fan-out groups.
    pub fn groups(&self) -> &FanoutGroups {
        &self.groups
    }

    /// Open a connection. Returns it with the receiving end of its outbox.
    pub fn connect(&self) -> (Connection, mpsc::Receiver<ServerEvent>) {
        let id = ConnectionId::new(self.next_connection.fetch_add(1, Ordering::Relaxed));
        let (outbox, events) = Outbox::channel(self.outbox_capacity);
        debug!(conn = %id, "connection opened");
        let conn = Connection {
            id,
            state: ConnectionState::Authenticating,
            outbox,
            groups: Arc::clone(&self.groups),
        };
        (conn, events)
    }

    /// Verify `token` and bind the resulting identity to `conn`.
    ///
    /// Re-authenticating replaces the identity and leaves any joined group.
    ///
    /// # Errors
    ///
    /// - [`SessionError::Disconnected`] if `conn` is closed
    /// - [`SessionError::Auth`] if the token is rejected; the state is unchanged
    pub async fn authenticate(
        &self,
        conn: &mut Connection,
        token: &str,
    ) -> Result<UserId, SessionError> {
        if conn.state == ConnectionState::Disconnected {
            return Err(SessionError::Disconnected);
        }
        let user = self.auth.verify_token(token).await.map_err(|err| {
            debug!(conn = %conn.id, error = %err, "authentication failed");
            err
        })?;
        conn.leave_group();
        conn.state = ConnectionState::Authenticated { user: user.clone() };
        info!(conn = %conn.id, user = %user, "authenticated");
        Ok(user)
    }

    /// The identity bound to `conn`, for request-level operations.
    ///
    /// # Errors
    ///
    /// - [`SessionError::Disconnected`] if `conn` is closed
    /// - [`SessionError::Auth`] if `conn` has not authenticated
    pub fn identity(&self, conn: &Connection) -> Result<UserId, SessionError> {
        Self::require_user(conn)
    }

    fn require_user(conn: &Connection) -> Result<UserId, SessionError> {
        match &conn.state {
            ConnectionState::Disconnected => Err(SessionError::Disconnected),
            state => state
                .user()
                .cloned()
                .ok_or(SessionError::Auth(AuthError::NotAuthenticated)),
        }
    }

    /// The identity of `conn` if it has joined `document`.
    ///
    /// A connection outside the group is gated for `write` first: a user
    /// without access gets `Forbidden`, a missing document `NotFound`.
    fn require_joined(
        &self,
        conn: &Connection,
        document: DocumentId,
    ) -> Result<UserId, SessionError> {
        let user = Self::require_user(conn)?;
        if conn.state.document() == Some(document) {
            return Ok(user);
        }
        self.engine
            .with_permission(document, &user, &requirements::WRITE, |_| ())?;
        Err(SessionError::NotJoined(document))
    }

    /// Join `document`'s session and queue its snapshot. Requires `read`.
    ///
    /// A connection is in at most one group: joining leaves the previous
    /// one. Re-joining the same document re-sends the snapshot.
    ///
    /// # Errors
    ///
    /// - [`SessionError::Auth`] if `conn` is not authenticated
    /// - [`SessionError::Core`] if the document is missing or unreadable;
    ///   the connection keeps its previous group
    pub fn join(&self, conn: &mut Connection, document: DocumentId) -> Result<(), SessionError> {
        let user = Self::require_user(conn)?;
        let previous = conn.document();
        self.engine
            .with_permission(document, &user, &requirements::READ, |doc| {
                if let Some(previous) = previous.filter(|p| *p != document) {
                    self.groups.leave(previous, conn.id);
                }
                self.groups.join(document, conn.id, conn.outbox.clone());
                conn.send(ServerEvent::DocumentData(doc.metadata_for(&user)));
            })?;
        info!(conn = %conn.id, user = %user, document = %document, "joined document");
        conn.state = ConnectionState::Joined { user, document };
        Ok(())
    }

    /// Relay a live edit to every other member of `document`'s group.
    /// Requires `write` and membership in the group.
    ///
    /// # Errors
    ///
    /// - [`SessionError::Core`] with `Forbidden` if the user cannot write,
    ///   joined or not; nothing is relayed
    /// - [`SessionError::Core`] with `NotFound` if the document is missing
    /// - [`SessionError::NotJoined`] if the user can write but `conn` has
    ///   not joined `document`
    pub fn broadcast_edit(
        &self,
        conn: &Connection,
        document: DocumentId,
        delta: serde_json::Value,
    ) -> Result<(), SessionError> {
        let user = self.require_joined(conn, document)?;
        let event = ServerEvent::TextChange {
            document_id: document,
            delta,
            user_id: user.clone(),
        };
        self.engine
            .with_permission(document, &user, &requirements::WRITE, |_| {
                self.groups.send_except(document, conn.id, &event);
            })?;
        Ok(())
    }

    /// Commit a version on the current branch. Every group member, the
    /// sender included, receives `versionSaved`. Requires `write` and
    /// membership in the group.
    ///
    /// # Errors
    ///
    /// Same as [`broadcast_edit`](Self::broadcast_edit).
    pub fn save_version(
        &self,
        conn: &Connection,
        document: DocumentId,
        content_ref: ContentRef,
        message: impl Into<String>,
    ) -> Result<Version, SessionError> {
        let user = self.require_joined(conn, document)?;
        Ok(self.engine.save_version(document, &user, content_ref, message)?)
    }

    /// Leave the current group, if any. Returns the document left.
    pub fn leave(&self, conn: &mut Connection) -> Option<DocumentId> {
        let left = conn.leave_group();
        if let Some(document) = left {
            info!(conn = %conn.id, document = %document, "left document");
        }
        left
    }

    /// Close `conn`. Idempotent.
    pub fn disconnect(&self, conn: &mut Connection) {
        if conn.state == ConnectionState::Disconnected {
            return;
        }
        conn.leave_group();
        conn.state = ConnectionState::Disconnected;
        debug!(conn = %conn.id, "connection closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticTokenProvider;
    use crate::core::types::{Permission, PermissionSet};

    fn user(id: &str) -> UserId {
        UserId::new(id).unwrap()
    }

    fn coordinator() -> SessionCoordinator {
        let auth =
            StaticTokenProvider::from_pairs([("t1", "u1"), ("t2", "u2"), ("t3", "u3")]).unwrap();
        SessionCoordinator::new(
            Arc::new(DocumentRegistry::new()),
            EngineSettings::default(),
            Arc::new(auth),
        )
    }

    fn drain(rx: &mut mpsc::Receiver<ServerEvent>) -> Vec<ServerEvent> {
        std::iter::from_fn(|| rx.try_recv().ok()).collect()
    }

    #[tokio::test]
    async fn unauthenticated_join_is_rejected() {
        let c = coordinator();
        let doc = c
            .engine()
            .create_document(&user("u1"), "t", ContentRef::default());
        let (mut conn, _rx) = c.connect();

        let err = c.join(&mut conn, doc.id).unwrap_err();
        assert_eq!(err.code(), "auth_error");
        assert_eq!(conn.state(), &ConnectionState::Authenticating);
    }

    #[tokio::test]
    async fn bad_token_leaves_state_unchanged() {
        let c = coordinator();
        let (mut conn, _rx) = c.connect();
        assert!(c.authenticate(&mut conn, "nope").await.is_err());
        assert_eq!(conn.state(), &ConnectionState::Authenticating);
    }

    #[tokio::test]
    async fn forbidden_join_keeps_previous_group() {
        let c = coordinator();
        let mine = c
            .engine()
            .create_document(&user("u1"), "mine", ContentRef::default());
        let theirs = c
            .engine()
            .create_document(&user("u2"), "theirs", ContentRef::default());
        let (mut conn, _rx) = c.connect();
        c.authenticate(&mut conn, "t1").await.unwrap();
        c.join(&mut conn, mine.id).unwrap();

        let err = c.join(&mut conn, theirs.id).unwrap_err();
        assert_eq!(err.code(), "forbidden");
        assert_eq!(conn.document(), Some(mine.id));
        assert!(c.groups().contains(mine.id, conn.id()));
    }

    #[tokio::test]
    async fn joining_another_document_switches_groups() {
        let c = coordinator();
        let a = c
            .engine()
            .create_document(&user("u1"), "a", ContentRef::default());
        let b = c
            .engine()
            .create_document(&user("u1"), "b", ContentRef::default());
        let (mut conn, mut rx) = c.connect();
        c.authenticate(&mut conn, "t1").await.unwrap();

        c.join(&mut conn, a.id).unwrap();
        c.join(&mut conn, b.id).unwrap();

        assert!(!c.groups().contains(a.id, conn.id()));
        assert!(c.groups().contains(b.id, conn.id()));
        assert_eq!(drain(&mut rx).len(), 2);
    }

    #[tokio::test]
    async fn reader_edit_is_forbidden_and_not_relayed() {
        let c = coordinator();
        let doc = c
            .engine()
            .create_document(&user("u1"), "t", ContentRef::default());
        c.engine()
            .add_collaborator(
                doc.id,
                &user("u1"),
                user("u2"),
                Some(PermissionSet::from_iter([Permission::Read])),
            )
            .unwrap();

        let (mut owner, mut owner_rx) = c.connect();
        let (mut reader, _reader_rx) = c.connect();
        c.authenticate(&mut owner, "t1").await.unwrap();
        c.authenticate(&mut reader, "t2").await.unwrap();
        c.join(&mut owner, doc.id).unwrap();
        c.join(&mut reader, doc.id).unwrap();
        drain(&mut owner_rx);

        let err = c
            .broadcast_edit(&reader, doc.id, serde_json::json!({"insert": "x"}))
            .unwrap_err();
        assert_eq!(err.code(), "forbidden");
        assert!(drain(&mut owner_rx).is_empty());
    }

    #[tokio::test]
    async fn edit_requires_membership() {
        let c = coordinator();
        let doc = c
            .engine()
            .create_document(&user("u1"), "t", ContentRef::default());
        let (mut conn, _rx) = c.connect();
        c.authenticate(&mut conn, "t1").await.unwrap();

        let err = c
            .broadcast_edit(&conn, doc.id, serde_json::json!(null))
            .unwrap_err();
        assert!(matches!(err, SessionError::NotJoined(id) if id == doc.id));
    }

    #[tokio::test]
    async fn stranger_outside_group_gets_forbidden() {
        let c = coordinator();
        let doc = c
            .engine()
            .create_document(&user("u1"), "t", ContentRef::default());
        let (mut conn, mut rx) = c.connect();
        c.authenticate(&mut conn, "t2").await.unwrap();

        let err = c
            .save_version(&conn, doc.id, ContentRef::new("c1"), "x")
            .unwrap_err();
        assert_eq!(err.code(), "forbidden");
        let err = c
            .broadcast_edit(&conn, doc.id, serde_json::json!({"insert": "x"}))
            .unwrap_err();
        assert_eq!(err.code(), "forbidden");

        let err = c
            .save_version(&conn, DocumentId::generate(), ContentRef::new("c1"), "x")
            .unwrap_err();
        assert_eq!(err.code(), "not_found");
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn slow_reader_is_evicted_from_group() {
        let c = coordinator().with_outbox_capacity(4);
        let doc = c
            .engine()
            .create_document(&user("u1"), "t", ContentRef::default());
        c.engine()
            .add_collaborator(doc.id, &user("u1"), user("u2"), None)
            .unwrap();
        let (mut writer, _writer_rx) = c.connect();
        let (mut reader, _reader_rx) = c.connect();
        c.authenticate(&mut writer, "t1").await.unwrap();
        c.authenticate(&mut reader, "t2").await.unwrap();
        c.join(&mut writer, doc.id).unwrap();
        c.join(&mut reader, doc.id).unwrap();
        let signal = reader.overflow_signal();

        for n in 0..8 {
            c.broadcast_edit(&writer, doc.id, serde_json::json!(n)).unwrap();
        }

        assert!(!c.groups().contains(doc.id, reader.id()));
        assert!(c.groups().contains(doc.id, writer.id()));
        signal.notified().await;
    }

    #[tokio::test]
    async fn disconnect_removes_membership_and_is_terminal() {
        let c = coordinator();
        let doc = c
            .engine()
            .create_document(&user("u1"), "t", ContentRef::default());
        let (mut conn, _rx) = c.connect();
        c.authenticate(&mut conn, "t1").await.unwrap();
        c.join(&mut conn, doc.id).unwrap();

        c.disconnect(&mut conn);
        c.disconnect(&mut conn);
        assert!(c.groups().members(doc.id).is_empty());
        assert!(matches!(
            c.authenticate(&mut conn, "t1").await,
            Err(SessionError::Disconnected)
        ));
        assert!(matches!(
            c.join(&mut conn, doc.id),
            Err(SessionError::Disconnected)
        ));
    }

    #[tokio::test]
    async fn dropping_connection_leaves_group() {
        let c = coordinator();
        let doc = c
            .engine()
            .create_document(&user("u1"), "t", ContentRef::default());
        let (mut conn, _rx) = c.connect();
        c.authenticate(&mut conn, "t1").await.unwrap();
        c.join(&mut conn, doc.id).unwrap();
        drop(conn);
        assert!(c.groups().members(doc.id).is_empty());
    }

    #[tokio::test]
    async fn leave_keeps_identity() {
        let c = coordinator();
        let doc = c
            .engine()
            .create_document(&user("u1"), "t", ContentRef::default());
        let (mut conn, _rx) = c.connect();
        c.authenticate(&mut conn, "t1").await.unwrap();
        c.join(&mut conn, doc.id).unwrap();

        assert_eq!(c.leave(&mut conn), Some(doc.id));
        assert_eq!(c.leave(&mut conn), None);
        assert_eq!(conn.user(), Some(&user("u1")));
    }
}
