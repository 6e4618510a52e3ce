//! session::fanout
//!
//! Per-document fan-out groups.
//!
//! # Architecture
//!
//! A group is the set of connections joined to one document, each with a
//! bounded [`Outbox`]. Delivery only enqueues: the network write happens in
//! the connection's own writer task, so sending never blocks the caller.
//!
//! Callers that need ordering (joins, edits, version broadcasts) send while
//! holding the document lock. The document lock is the sole source of a total
//! order for one document, and every member observes the same order.
//!
//! A member whose outbox is full is evicted from the group and its overflow
//! signal fires; the transport closes the connection on that signal.
//!
//! # Lock order
//!
//! Document lock, then the group map, then a group lock. Nothing is acquired
//! while a group lock is held.
//!
//! # Invariants
//!
//! - A connection appears at most once per group
//! - A member whose outbox is closed is dropped on the next delivery,
//!   silently
//! - A group with no members is removed from the map

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, Notify};
use tracing::{debug, warn};

use super::connection::ConnectionId;
use super::events::ServerEvent;
use crate::core::graph::Version;
use crate::core::types::DocumentId;
use crate::engine::VersionObserver;

/// Sending half of a connection's bounded event queue.
///
/// Clones share the queue and the overflow signal.
#[derive(Debug, Clone)]
pub struct Outbox {
    tx: mpsc::Sender<ServerEvent>,
    overflow: Arc<Notify>,
}

/// Result of queueing one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// The event is queued.
    Queued,
    /// The receiver is gone.
    Closed,
    /// The queue is full; the overflow signal has fired.
    Overflowed,
}

impl Outbox {
    /// Create an outbox holding at most `capacity` undelivered events.
    ///
    /// A zero capacity is raised to one.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<ServerEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let outbox = Self {
            tx,
            overflow: Arc::new(Notify::new()),
        };
        (outbox, rx)
    }

    /// Queue `event` without waiting.
    pub fn push(&self, event: ServerEvent) -> Delivery {
        match self.tx.try_send(event) {
            Ok(()) => Delivery::Queued,
            Err(TrySendError::Closed(_)) => Delivery::Closed,
            Err(TrySendError::Full(_)) => {
                self.overflow.notify_one();
                Delivery::Overflowed
            }
        }
    }

    /// Signal that completes once this outbox has overflowed.
    ///
    /// The signal latches: awaiting `notified()` after an overflow completes
    /// immediately.
    pub fn overflow_signal(&self) -> Arc<Notify> {
        Arc::clone(&self.overflow)
    }
}

#[derive(Debug, Default)]
struct FanoutGroup {
    members: BTreeMap<ConnectionId, Outbox>,
}

impl FanoutGroup {
    /// Deliver to every member but `except`. Returns whether the group is
    /// now empty.
    fn deliver(
        &mut self,
        document: DocumentId,
        except: Option<ConnectionId>,
        event: &ServerEvent,
    ) -> bool {
        self.members.retain(|conn, outbox| {
            if Some(*conn) == except {
                return true;
            }
            match outbox.push(event.clone()) {
                Delivery::Queued => true,
                Delivery::Closed => {
                    debug!(document = %document, conn = %conn, "dropping closed connection from group");
                    false
                }
                Delivery::Overflowed => {
                    warn!(document = %document, conn = %conn, "outbox full, evicting slow connection");
                    false
                }
            }
        });
        self.members.is_empty()
    }
}

/// All fan-out groups, keyed by document.
#[derive(Debug, Default)]
pub struct FanoutGroups {
    groups: RwLock<HashMap<DocumentId, Arc<Mutex<FanoutGroup>>>>,
}

impl FanoutGroups {
    /// Create an empty set of groups.
    pub fn new() -> Self {
        Self::default()
    }

    fn existing(&self, document: DocumentId) -> Option<Arc<Mutex<FanoutGroup>>> {
        self.groups
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&document)
            .cloned()
    }

    fn lock(group: &Mutex<FanoutGroup>) -> MutexGuard<'_, FanoutGroup> {
        group.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Remove `group` from the map if it is still the entry for `document`
    /// and has no members.
    fn discard_if_empty(&self, document: DocumentId, group: &Arc<Mutex<FanoutGroup>>) {
        let mut groups = self.groups.write().unwrap_or_else(PoisonError::into_inner);
        let empty = matches!(
            groups.get(&document),
            Some(current) if Arc::ptr_eq(current, group) && Self::lock(current).members.is_empty()
        );
        if empty {
            groups.remove(&document);
            debug!(document = %document, "removed empty group");
        }
    }

    /// Add `conn` to `document`'s group. Re-adding replaces the outbox.
    pub fn join(&self, document: DocumentId, conn: ConnectionId, outbox: Outbox) {
        // Insert under the map lock so a concurrent discard cannot orphan
        // the member.
        let mut groups = self.groups.write().unwrap_or_else(PoisonError::into_inner);
        let group = groups.entry(document).or_default();
        Self::lock(group.as_ref()).members.insert(conn, outbox);
        drop(groups);
        debug!(document = %document, conn = %conn, "joined group");
    }

    /// Remove `conn` from `document`'s group. Returns whether it was a member.
    pub fn leave(&self, document: DocumentId, conn: ConnectionId) -> bool {
        let Some(group) = self.existing(document) else {
            return false;
        };
        let (removed, empty) = {
            let mut guard = Self::lock(&group);
            let removed = guard.members.remove(&conn).is_some();
            (removed, guard.members.is_empty())
        };
        if removed {
            debug!(document = %document, conn = %conn, "left group");
        }
        if empty {
            self.discard_if_empty(document, &group);
        }
        removed
    }

    fn broadcast(&self, document: DocumentId, except: Option<ConnectionId>, event: &ServerEvent) {
        let Some(group) = self.existing(document) else {
            return;
        };
        let empty = Self::lock(&group).deliver(document, except, event);
        if empty {
            self.discard_if_empty(document, &group);
        }
    }

    /// Deliver `event` to every member of `document`'s group.
    pub fn send_to_all(&self, document: DocumentId, event: &ServerEvent) {
        self.broadcast(document, None, event);
    }

    /// Deliver `event` to every member except `sender`.
    pub fn send_except(&self, document: DocumentId, sender: ConnectionId, event: &ServerEvent) {
        self.broadcast(document, Some(sender), event);
    }

    /// Current members of `document`'s group, in connection order.
    pub fn members(&self, document: DocumentId) -> Vec<ConnectionId> {
        let Some(group) = self.existing(document) else {
            return Vec::new();
        };
        let members = Self::lock(&group).members.keys().copied().collect();
        members
    }

    /// Whether `conn` is a member of `document`'s group.
    pub fn contains(&self, document: DocumentId, conn: ConnectionId) -> bool {
        let Some(group) = self.existing(document) else {
            return false;
        };
        let found = Self::lock(&group).members.contains_key(&conn);
        found
    }

    /// Number of documents with at least one member.
    pub fn active_documents(&self) -> usize {
        self.groups
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl VersionObserver for FanoutGroups {
    fn version_created(&self, document: DocumentId, version: &Version) {
        self.send_to_all(
            document,
            &ServerEvent::VersionSaved {
                document_id: document,
                version: version.clone(),
            },
        );
    }
}
