//! session::connection
//!
//! One participant's live connection and its state machine.
//!
//! ```text
//! Disconnected -> Authenticating -> Authenticated -> Joined(doc)
//!                                         ^               |
//!                                         +---- leave ----+
//! ```
//!
//! Any state moves to `Disconnected` on disconnect. Dropping a connection
//! removes it from its fan-out group.

use std::fmt;
use std::sync::Arc;

use tokio::sync::Notify;

use super::events::ServerEvent;
use super::fanout::{Delivery, FanoutGroups, Outbox};
use crate::core::types::{DocumentId, UserId};

/// Process-unique connection identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Wrap a raw id.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw id.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Where a connection is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    /// Connected, no identity yet.
    Authenticating,
    /// Identity established, not in any document session.
    Authenticated { user: UserId },
    /// Member of `document`'s fan-out group.
    Joined { user: UserId, document: DocumentId },
    /// Closed. Terminal.
    Disconnected,
}

impl ConnectionState {
    /// The authenticated identity, if any.
    pub fn user(&self) -> Option<&UserId> {
        match self {
            ConnectionState::Authenticated { user } | ConnectionState::Joined { user, .. } => Some(user),
            ConnectionState::Authenticating | ConnectionState::Disconnected => None,
        }
    }

    /// The joined document, if any.
    pub fn document(&self) -> Option<DocumentId> {
        match self {
            ConnectionState::Joined { document, .. } => Some(*document),
            _ => None,
        }
    }
}

/// A participant's connection.
///
/// Created by [`SessionCoordinator::connect`](super::SessionCoordinator::connect),
/// which also hands back the receiving end of the outbox.
#[derive(Debug)]
pub struct Connection {
    pub(super) id: ConnectionId,
    pub(super) state: ConnectionState,
    pub(super) outbox: Outbox,
    pub(super) groups: Arc<FanoutGroups>,
}

impl Connection {
    /// This connection's id.
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Current lifecycle state.
    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    /// The authenticated identity, if any.
    pub fn user(&self) -> Option<&UserId> {
        self.state.user()
    }

    /// The joined document, if any.
    pub fn document(&self) -> Option<DocumentId> {
        self.state.document()
    }

    /// Queue a reply for this connection only. Returns `false` if the
    /// receiving side is gone or the outbox is full.
    pub fn send(&self, event: ServerEvent) -> bool {
        self.outbox.push(event) == Delivery::Queued
    }

    /// Fires once this connection's outbox has overflowed. The transport
    /// closes the connection when it does.
    pub fn overflow_signal(&self) -> Arc<Notify> {
        self.outbox.overflow_signal()
    }

    /// Leave the current group, if any, keeping the identity.
    pub(super) fn leave_group(&mut self) -> Option<DocumentId> {
        let ConnectionState::Joined { user, document } = &self.state else {
            return None;
        };
        let document = *document;
        self.groups.leave(document, self.id);
        self.state = ConnectionState::Authenticated { user: user.clone() };
        Some(document)
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if let Some(document) = self.state.document() {
            self.groups.leave(document, self.id);
        }
    }
}
