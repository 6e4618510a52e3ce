//! core::access
//!
//! Permission evaluation over a document's access list.
//!
//! Pure and side-effect free. Callers hold the document's lock (or an owned
//! snapshot) for the duration of the check.
//!
//! # Rules
//!
//! 1. The owner holds every permission.
//! 2. A principal absent from the collaborator list holds none.
//! 3. `admin` in a collaborator's set grants every permission.
//! 4. Otherwise membership is exact: `write` does not imply `read`.

use super::graph::Document;
use super::types::{Permission, UserId};

/// Whether `user` holds `permission` on `doc`.
///
/// # Example
///
/// ```
/// use collabdoc::core::access::has_permission;
/// use collabdoc::core::graph::Document;
/// use collabdoc::core::types::{ContentRef, DocumentId, Permission, PermissionSet, UserId};
///
/// let owner = UserId::new("u1").unwrap();
/// let writer = UserId::new("u2").unwrap();
/// let mut doc = Document::new(DocumentId::generate(), "Spec", ContentRef::default(), owner.clone());
/// doc.add_collaborator(writer.clone(), PermissionSet::from_iter([Permission::Write]));
///
/// assert!(has_permission(&doc, &owner, Permission::Admin));
/// assert!(has_permission(&doc, &writer, Permission::Write));
/// assert!(!has_permission(&doc, &writer, Permission::Read));
/// ```
pub fn has_permission(doc: &Document, user: &UserId, permission: Permission) -> bool {
    if doc.owner_id() == user {
        return true;
    }
    match doc.collaborators().get(user) {
        Some(granted) => granted.contains(Permission::Admin) || granted.contains(permission),
        None => false,
    }
}
