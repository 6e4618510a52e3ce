//! auth::errors
//!
//! Authentication error types.
//!
//! # Design
//!
//! Error messages MUST NOT contain tokens. All error variants are designed
//! to provide useful context without exposing sensitive data.
//!
//! # Example
//!
//! ```
//! use collabdoc::auth::AuthError;
//!
//! let err = AuthError::InvalidToken;
//! assert_eq!(err.code(), "auth_error");
//! ```

use thiserror::Error;

/// Errors from authentication operations.
///
/// # Security
///
/// Error messages intentionally do not include token values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// No token was presented.
    #[error("authentication error: no token presented")]
    MissingToken,

    /// The token is unknown, expired, or revoked.
    #[error("authentication error: invalid token")]
    InvalidToken,

    /// The connection attempted an operation before authenticating.
    #[error("authentication error: connection is not authenticated")]
    NotAuthenticated,

    /// The provider itself failed (misconfiguration, backend unavailable).
    #[error("authentication provider error: {0}")]
    Provider(String),
}

impl AuthError {
    /// Stable snake_case code for the wire protocol.
    pub fn code(&self) -> &'static str {
        "auth_error"
    }

    /// Check if this error indicates a transient failure that might succeed on retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, AuthError::Provider(_))
    }
}
