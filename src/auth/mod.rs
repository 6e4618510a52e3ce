//! auth - principal resolution for incoming connections
//!
//! Authentication itself (credential storage, token issuance) lives outside
//! this crate. The core only needs a way to turn a presented token into a
//! [`UserId`] before any document operation runs.
//!
//! # Components
//!
//! - [`AuthProvider`] - Trait verifying a bearer token
//! - [`StaticTokenProvider`] - Table-backed provider fed from config
//! - [`AuthError`] - Rejections, raised before the core is reached
//!
//! # Security
//!
//! Tokens never appear in logs, error messages, or `Debug` output.

mod errors;
mod provider;

pub use errors::AuthError;
pub use provider::StaticTokenProvider;

use crate::core::types::UserId;

/// Trait for verifying bearer tokens presented by connections.
///
/// # Implementation Notes
///
/// Implementors must never log or expose token values, including in the
/// errors they return.
///
/// # Example
///
/// ```
/// use collabdoc::auth::{AuthProvider, StaticTokenProvider};
///
/// # tokio_test::block_on(async {
/// let provider = StaticTokenProvider::from_pairs([("tok-1", "alice")]).unwrap();
/// let user = provider.verify_token("tok-1").await.unwrap();
/// assert_eq!(user.as_str(), "alice");
/// assert!(provider.verify_token("wrong").await.is_err());
/// # });
/// ```
#[async_trait::async_trait]
pub trait AuthProvider: Send + Sync {
    /// Resolve `token` to the principal it was issued for.
    ///
    /// # Errors
    ///
    /// - [`AuthError::MissingToken`] if `token` is empty
    /// - [`AuthError::InvalidToken`] if the token is unknown or revoked
    async fn verify_token(&self, token: &str) -> Result<UserId, AuthError>;
}
