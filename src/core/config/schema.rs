//! core::config::schema
//!
//! Configuration schema types.
//!
//! # Example
//!
//! ```toml
//! [server]
//! listen = "127.0.0.1:3001"
//! max_frame_bytes = 1048576
//! outbox_capacity = 1024
//!
//! [documents]
//! duplicate_branch = "reject"
//! default_permissions = ["read"]
//!
//! [log]
//! filter = "collabdoc=info"
//!
//! [auth.tokens]
//! "tok-alice" = "alice"
//! ```
//!
//! # Validation
//!
//! Config values are validated after parsing (user ids in the token table
//! must be valid, the default permission list must not be empty, ...).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::SocketAddr;

use super::ConfigError;
use crate::core::graph::BranchPolicy;
use crate::core::types::{Permission, UserId};

/// The whole configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    /// Transport settings
    pub server: Option<ServerConfig>,

    /// Document behavior
    pub documents: Option<DocumentsConfig>,

    /// Logging settings
    pub log: Option<LogConfig>,

    /// Static token table
    pub auth: Option<AuthConfig>,
}

impl ConfigFile {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(server) = &self.server {
            server.validate()?;
        }
        if let Some(documents) = &self.documents {
            documents.validate()?;
        }
        if let Some(log) = &self.log {
            log.validate()?;
        }
        if let Some(auth) = &self.auth {
            auth.validate()?;
        }
        Ok(())
    }
}

/// Transport settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Address the TCP server binds to
    pub listen: Option<SocketAddr>,

    /// Longest request line accepted, in bytes
    pub max_frame_bytes: Option<usize>,

    /// Undelivered events a connection may queue before it is closed
    pub outbox_capacity: Option<usize>,
}

impl ServerConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_frame_bytes == Some(0) {
            return Err(ConfigError::InvalidValue(
                "server.max_frame_bytes must be positive".to_string(),
            ));
        }
        if self.outbox_capacity == Some(0) {
            return Err(ConfigError::InvalidValue(
                "server.outbox_capacity must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Document behavior.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct DocumentsConfig {
    /// What `create_branch` does with an existing name
    pub duplicate_branch: Option<BranchPolicy>,

    /// Grant used when a collaborator is added without explicit permissions
    pub default_permissions: Option<Vec<Permission>>,
}

impl DocumentsConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(perms) = &self.default_permissions {
            if perms.is_empty() {
                return Err(ConfigError::InvalidValue(
                    "documents.default_permissions cannot be empty".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Logging settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    /// `tracing` filter directive, e.g. `collabdoc=debug`
    pub filter: Option<String>,
}

impl LogConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(filter) = &self.filter {
            if filter.trim().is_empty() {
                return Err(ConfigError::InvalidValue(
                    "log.filter cannot be empty".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Static token table consumed by the built-in auth provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct AuthConfig {
    /// Token → user id
    pub tokens: BTreeMap<String, String>,
}

impl AuthConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        for (token, user) in &self.tokens {
            if token.is_empty() {
                return Err(ConfigError::InvalidValue(
                    "auth.tokens cannot contain an empty token".to_string(),
                ));
            }
            // Report the user, never the token.
            UserId::new(user.as_str()).map_err(|e| {
                ConfigError::InvalidValue(format!("invalid user in auth.tokens: {e}"))
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_file() {
        let parsed: ConfigFile = toml::from_str(
            r#"
            [server]
            listen = "0.0.0.0:4000"

            [documents]
            duplicate_branch = "overwrite"
            default_permissions = ["read", "write"]

            [log]
            filter = "collabdoc=debug"

            [auth.tokens]
            "tok-a" = "alice"
            "#,
        )
        .unwrap();

        assert_eq!(
            parsed.server.unwrap().listen.unwrap().to_string(),
            "0.0.0.0:4000"
        );
        let documents = parsed.documents.unwrap();
        assert_eq!(documents.duplicate_branch, Some(BranchPolicy::Overwrite));
        assert_eq!(
            documents.default_permissions,
            Some(vec![Permission::Read, Permission::Write])
        );
        assert_eq!(parsed.auth.unwrap().tokens["tok-a"], "alice");
    }

    #[test]
    fn zero_server_limits_rejected() {
        for field in ["max_frame_bytes", "outbox_capacity"] {
            let parsed: ConfigFile = toml::from_str(&format!("[server]\n{field} = 0\n")).unwrap();
            assert!(parsed.validate().is_err(), "{field} = 0 accepted");
        }
    }

    #[test]
    fn empty_default_permissions_rejected() {
        let parsed: ConfigFile = toml::from_str(
            r#"
            [documents]
            default_permissions = []
            "#,
        )
        .unwrap();
        assert!(parsed.validate().is_err());
    }

    #[test]
    fn invalid_user_in_token_table_rejected_without_token() {
        let parsed: ConfigFile = toml::from_str(
            r#"
            [auth.tokens]
            "secret-token" = "bad user"
            "#,
        )
        .unwrap();
        let err = parsed.validate().unwrap_err().to_string();
        assert!(!err.contains("secret-token"));
    }

    #[test]
    fn unknown_policy_fails_to_parse() {
        let parsed: Result<ConfigFile, _> = toml::from_str(
            r#"
            [documents]
            duplicate_branch = "merge"
            "#,
        );
        assert!(parsed.is_err());
    }
}
