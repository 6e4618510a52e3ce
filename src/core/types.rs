//! core::types
//!
//! Strong types for core domain concepts.
//!
//! # Types
//!
//! - [`DocumentId`] - Random unique document identifier
//! - [`UserId`] - Authenticated principal identifier
//! - [`VersionId`] - Per-document monotonic version sequence number
//! - [`BranchName`] - Validated branch name
//! - [`ContentRef`] - Opaque reference to externally stored content
//! - [`UtcTimestamp`] - RFC3339 timestamp
//! - [`Permission`] / [`PermissionSet`] - Access control grants
//!
//! # Validation
//!
//! These types enforce validity at construction time. Invalid values
//! cannot be represented, preventing entire classes of bugs.
//!
//! # Examples
//!
//! ```
//! use collabdoc::core::types::{BranchName, Permission, PermissionSet, UserId};
//!
//! let branch = BranchName::new("feature/outline").unwrap();
//! let user = UserId::new("alice").unwrap();
//! let grants = PermissionSet::from_iter([Permission::Read, Permission::Write]);
//!
//! assert!(grants.contains(Permission::Write));
//! assert!(BranchName::new("has space").is_err());
//! assert!(UserId::new("").is_err());
//! # let _ = (branch, user);
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid branch name: {0}")]
    InvalidBranchName(String),

    #[error("invalid user id: {0}")]
    InvalidUserId(String),

    #[error("invalid document id: {0}")]
    InvalidDocumentId(String),

    #[error("invalid permission: {0}")]
    InvalidPermission(String),
}

/// A document identifier.
///
/// Identifiers are random v4 UUIDs, so two documents created in the same
/// instant never collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(Uuid);

impl DocumentId {
    /// Allocate a fresh identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse an identifier from its hyphenated string form.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidDocumentId` if the string is not a UUID.
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| TypeError::InvalidDocumentId(format!("'{s}': {e}")))
    }

    /// Get the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl FromStr for DocumentId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An authenticated principal.
///
/// User ids are issued by the external auth provider; the core only requires
/// them to be non-empty and free of whitespace and control characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    /// Create a new validated user id.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidUserId` if the id is empty or contains
    /// whitespace or control characters.
    pub fn new(id: impl Into<String>) -> Result<Self, TypeError> {
        let id = id.into();
        if id.is_empty() {
            return Err(TypeError::InvalidUserId("user id cannot be empty".into()));
        }
        if id.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(TypeError::InvalidUserId(format!(
                "user id '{}' cannot contain whitespace or control characters",
                id.escape_debug()
            )));
        }
        Ok(Self(id))
    }

    /// Get the user id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for UserId {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<UserId> for String {
    fn from(id: UserId) -> Self {
        id.0
    }
}

impl AsRef<str> for UserId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A version identifier, unique within one document.
///
/// Ids are allocated sequentially starting at [`VersionId::INITIAL`], so the
/// id of a version is also its position in the document's creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionId(u64);

impl VersionId {
    /// The id of the version every document is created with.
    pub const INITIAL: VersionId = VersionId(0);

    /// Wrap a raw sequence number.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The id allocated after this one.
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// Get the raw sequence number.
    pub fn get(self) -> u64 {
        self.0
    }

    /// Position of this version in creation order.
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for VersionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// A validated branch name.
///
/// Branch names:
/// - Cannot be empty or longer than 255 bytes
/// - Cannot start with `.` or `-`
/// - Cannot contain `..`, whitespace, or control characters
///
/// # Example
///
/// ```
/// use collabdoc::core::types::BranchName;
///
/// let name = BranchName::new("feature/intro").unwrap();
/// assert_eq!(name.as_str(), "feature/intro");
/// assert_eq!(BranchName::master().as_str(), "master");
///
/// assert!(BranchName::new("").is_err());
/// assert!(BranchName::new(".hidden").is_err());
/// assert!(BranchName::new("two words").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BranchName(String);

impl BranchName {
    /// Name of the branch every document starts on.
    pub const MASTER: &'static str = "master";

    const MAX_LEN: usize = 255;

    /// Create a new validated branch name.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidBranchName` if the name violates the rules above.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        Self::validate(&name)?;
        Ok(Self(name))
    }

    /// The default `master` branch.
    pub fn master() -> Self {
        Self(Self::MASTER.to_string())
    }

    fn validate(name: &str) -> Result<(), TypeError> {
        if name.is_empty() {
            return Err(TypeError::InvalidBranchName(
                "branch name cannot be empty".into(),
            ));
        }
        if name.len() > Self::MAX_LEN {
            return Err(TypeError::InvalidBranchName(format!(
                "branch name cannot exceed {} bytes",
                Self::MAX_LEN
            )));
        }
        if name.starts_with('.') {
            return Err(TypeError::InvalidBranchName(
                "branch name cannot start with '.'".into(),
            ));
        }
        if name.starts_with('-') {
            return Err(TypeError::InvalidBranchName(
                "branch name cannot start with '-'".into(),
            ));
        }
        if name.contains("..") {
            return Err(TypeError::InvalidBranchName(
                "branch name cannot contain '..'".into(),
            ));
        }
        if name.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(TypeError::InvalidBranchName(
                "branch name cannot contain whitespace or control characters".into(),
            ));
        }
        Ok(())
    }

    /// Get the branch name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for BranchName {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<BranchName> for String {
    fn from(name: BranchName) -> Self {
        name.0
    }
}

impl AsRef<str> for BranchName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BranchName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque reference to externally stored (and externally encrypted) content.
///
/// The core passes these through untouched. An empty reference is allowed
/// for documents created without content.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentRef(String);

impl ContentRef {
    /// Wrap a reference string.
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    /// Get the reference as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the reference is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for ContentRef {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl std::fmt::Display for ContentRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A UTC timestamp in RFC3339 format.
///
/// # Example
///
/// ```
/// use collabdoc::core::types::UtcTimestamp;
///
/// let now = UtcTimestamp::now();
/// println!("Current time: {}", now);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UtcTimestamp(chrono::DateTime<chrono::Utc>);

impl UtcTimestamp {
    /// Create a timestamp for the current moment.
    pub fn now() -> Self {
        Self(chrono::Utc::now())
    }

    /// Create a timestamp from a chrono DateTime.
    pub fn from_datetime(dt: chrono::DateTime<chrono::Utc>) -> Self {
        Self(dt)
    }

    /// Get the underlying datetime.
    pub fn as_datetime(&self) -> &chrono::DateTime<chrono::Utc> {
        &self.0
    }
}

impl std::fmt::Display for UtcTimestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

/// A single access grant on a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    Read,
    Write,
    Admin,
}

impl Permission {
    /// All permissions, in ascending order.
    pub const ALL: [Permission; 3] = [Permission::Read, Permission::Write, Permission::Admin];

    /// Lowercase name used on the wire and in config files.
    pub fn as_str(self) -> &'static str {
        match self {
            Permission::Read => "read",
            Permission::Write => "write",
            Permission::Admin => "admin",
        }
    }
}

impl FromStr for Permission {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "read" => Ok(Permission::Read),
            "write" => Ok(Permission::Write),
            "admin" => Ok(Permission::Admin),
            other => Err(TypeError::InvalidPermission(format!(
                "'{other}', must be one of: read, write, admin"
            ))),
        }
    }
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The set of permissions granted to one collaborator.
///
/// Membership is exact: holding `write` says nothing about `read`. The
/// universal `admin` grant is interpreted by [`crate::core::access`], not here.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionSet(BTreeSet<Permission>);

impl PermissionSet {
    /// An empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `permission` is a member.
    pub fn contains(&self, permission: Permission) -> bool {
        self.0.contains(&permission)
    }

    /// Add a permission.
    pub fn insert(&mut self, permission: Permission) {
        self.0.insert(permission);
    }

    /// Whether the set grants nothing.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate members in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = Permission> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<Permission> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = Permission>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl std::fmt::Display for PermissionSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.iter().map(Permission::as_str).collect();
        write!(f, "[{}]", names.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod branch_name {
        use super::*;

        #[test]
        fn valid_branch_names() {
            assert!(BranchName::new("master").is_ok());
            assert!(BranchName::new("feature/foo").is_ok());
            assert!(BranchName::new("fix-123").is_ok());
            assert!(BranchName::new("with.dot").is_ok());
            assert!(BranchName::new("draft@2").is_ok());
        }

        #[test]
        fn empty_name_rejected() {
            assert!(BranchName::new("").is_err());
        }

        #[test]
        fn leading_dot_or_dash_rejected() {
            assert!(BranchName::new(".hidden").is_err());
            assert!(BranchName::new("-flag").is_err());
        }

        #[test]
        fn double_dot_rejected() {
            assert!(BranchName::new("a..b").is_err());
        }

        #[test]
        fn whitespace_and_control_rejected() {
            assert!(BranchName::new("two words").is_err());
            assert!(BranchName::new("tab\there").is_err());
            assert!(BranchName::new("nul\0").is_err());
        }

        #[test]
        fn overlong_name_rejected() {
            assert!(BranchName::new("a".repeat(256)).is_err());
            assert!(BranchName::new("a".repeat(255)).is_ok());
        }

        #[test]
        fn serde_validates_on_deserialize() {
            let ok: Result<BranchName, _> = serde_json::from_str("\"feature\"");
            assert!(ok.is_ok());
            let bad: Result<BranchName, _> = serde_json::from_str("\"bad name\"");
            assert!(bad.is_err());
        }
    }

    mod user_id {
        use super::*;

        #[test]
        fn rejects_empty_and_whitespace() {
            assert!(UserId::new("").is_err());
            assert!(UserId::new("a b").is_err());
            assert!(UserId::new("u1").is_ok());
        }
    }

    mod document_id {
        use super::*;

        #[test]
        fn generated_ids_are_unique() {
            let ids: BTreeSet<DocumentId> = (0..1000).map(|_| DocumentId::generate()).collect();
            assert_eq!(ids.len(), 1000);
        }

        #[test]
        fn parse_round_trips_display() {
            let id = DocumentId::generate();
            assert_eq!(DocumentId::parse(&id.to_string()).unwrap(), id);
            assert!(DocumentId::parse("1700000000000").is_err());
        }
    }

    mod version_id {
        use super::*;

        #[test]
        fn next_is_monotonic() {
            let v0 = VersionId::INITIAL;
            let v1 = v0.next();
            assert!(v1 > v0);
            assert_eq!(v1.get(), 1);
            assert_eq!(v1.to_string(), "v1");
        }
    }

    mod permissions {
        use super::*;

        #[test]
        fn parse_known_names() {
            assert_eq!("read".parse::<Permission>().unwrap(), Permission::Read);
            assert_eq!("write".parse::<Permission>().unwrap(), Permission::Write);
            assert_eq!("admin".parse::<Permission>().unwrap(), Permission::Admin);
            assert!("owner".parse::<Permission>().is_err());
        }

        #[test]
        fn set_membership_is_exact() {
            let set = PermissionSet::from_iter([Permission::Write]);
            assert!(set.contains(Permission::Write));
            assert!(!set.contains(Permission::Read));
        }

        #[test]
        fn set_serializes_as_list() {
            let set = PermissionSet::from_iter([Permission::Write, Permission::Read]);
            let json = serde_json::to_string(&set).unwrap();
            assert_eq!(json, r#"["read","write"]"#);
        }

        #[test]
        fn unknown_permission_fails_to_deserialize() {
            let parsed: Result<PermissionSet, _> = serde_json::from_str(r#"["root"]"#);
            assert!(parsed.is_err());
        }
    }
}
