//! auth::provider
//!
//! StaticTokenProvider - AuthProvider backed by a fixed token table.
//!
//! The table normally comes from the `[auth.tokens]` config section. It is
//! suitable for development and tests; production deployments put a real
//! identity service behind [`AuthProvider`].

use std::collections::HashMap;

use super::errors::AuthError;
use super::AuthProvider;
use crate::core::types::{TypeError, UserId};

/// Token table provider.
pub struct StaticTokenProvider {
    tokens: HashMap<String, UserId>,
}

impl StaticTokenProvider {
    /// Build a provider from `(token, user)` pairs.
    ///
    /// # Errors
    ///
    /// Returns a `TypeError` if any user id is invalid.
    pub fn from_pairs<T, U, I>(pairs: I) -> Result<Self, TypeError>
    where
        T: Into<String>,
        U: Into<String>,
        I: IntoIterator<Item = (T, U)>,
    {
        let tokens = pairs
            .into_iter()
            .map(|(token, user)| Ok((token.into(), UserId::new(user)?)))
            .collect::<Result<HashMap<_, _>, TypeError>>()?;
        Ok(Self { tokens })
    }

    /// Number of known tokens.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Whether no tokens are configured.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl std::fmt::Debug for StaticTokenProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticTokenProvider")
            .field("tokens", &format_args!("<{} redacted>", self.tokens.len()))
            .finish()
    }
}

#[async_trait::async_trait]
impl AuthProvider for StaticTokenProvider {
    async fn verify_token(&self, token: &str) -> Result<UserId, AuthError> {
        if token.is_empty() {
            return Err(AuthError::MissingToken);
        }
        self.tokens
            .get(token)
            .cloned()
            .ok_or(AuthError::InvalidToken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> StaticTokenProvider {
        StaticTokenProvider::from_pairs([("tok-a", "alice"), ("tok-b", "bob")]).unwrap()
    }

    #[tokio::test]
    async fn known_token_resolves() {
        let user = provider().verify_token("tok-b").await.unwrap();
        assert_eq!(user.as_str(), "bob");
    }

    #[tokio::test]
    async fn unknown_and_empty_tokens_rejected() {
        let p = provider();
        assert_eq!(p.verify_token("nope").await, Err(AuthError::InvalidToken));
        assert_eq!(p.verify_token("").await, Err(AuthError::MissingToken));
    }

    #[test]
    fn invalid_user_rejected_at_construction() {
        assert!(StaticTokenProvider::from_pairs([("t", "")]).is_err());
    }

    #[test]
    fn debug_redacts_tokens() {
        let debug = format!("{:?}", provider());
        assert!(!debug.contains("tok-a"));
        assert!(debug.contains("2 redacted"));
    }
}
