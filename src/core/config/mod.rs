//! core::config
//!
//! Configuration schema and loading.
//!
//! # Locations
//!
//! An explicit path (the `--config` flag) wins. Otherwise, searched in order:
//! 1. `$COLLABDOC_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/collabdoc/config.toml`
//! 3. `~/.collabdoc/config.toml` (canonical write location)
//!
//! A missing file is not an error; defaults are used.
//!
//! # Example
//!
//! ```no_run
//! use collabdoc::core::config::Config;
//!
//! let result = Config::load(None).unwrap();
//! let config = result.config;
//!
//! println!("Listening on: {}", config.listen());
//! println!("Duplicate branches: {:?}", config.duplicate_branch());
//! ```

pub mod schema;

pub use schema::{AuthConfig, ConfigFile, DocumentsConfig, LogConfig, ServerConfig};

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::graph::BranchPolicy;
use crate::core::types::{Permission, PermissionSet};

/// Default listen address.
pub const DEFAULT_LISTEN: SocketAddr = SocketAddr::new(
    std::net::IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)),
    3001,
);

/// Default longest accepted request line, in bytes.
pub const DEFAULT_MAX_FRAME_BYTES: usize = 1 << 20;

/// Default number of undelivered events a connection may have queued.
pub const DEFAULT_OUTBOX_CAPACITY: usize = 1024;

/// Default `tracing` filter directive.
pub const DEFAULT_LOG_FILTER: &str = "collabdoc=info";

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("failed to write config file '{path}': {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config value: {0}")]
    InvalidValue(String),

    #[error("home directory not found")]
    NoHomeDir,
}

/// Result of loading configuration.
#[derive(Debug)]
pub struct ConfigLoadResult {
    /// The loaded configuration.
    pub config: Config,
    /// The file it was read from, if any.
    pub path: Option<PathBuf>,
}

/// Loaded configuration with defaults applied by the accessors.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Parsed file contents
    pub file: ConfigFile,
    listen_override: Option<SocketAddr>,
}

impl Config {
    /// Wrap already-parsed contents.
    pub fn from_file(file: ConfigFile) -> Self {
        Self {
            file,
            listen_override: None,
        }
    }

    /// Load configuration from `explicit` or the default locations.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be read, parsed,
    /// or validated. An explicit path that does not exist is a read error.
    pub fn load(explicit: Option<&Path>) -> Result<ConfigLoadResult, ConfigError> {
        let path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => Self::search_paths().into_iter().find(|p| p.exists()),
        };

        let file = match &path {
            Some(path) => Self::read_config(path)?,
            None => ConfigFile::default(),
        };
        file.validate()?;

        Ok(ConfigLoadResult {
            config: Config::from_file(file),
            path,
        })
    }

    /// Candidate config locations, highest precedence first.
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Ok(path) = std::env::var("COLLABDOC_CONFIG") {
            paths.push(PathBuf::from(path));
        }
        if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
            paths.push(PathBuf::from(xdg_home).join("collabdoc/config.toml"));
        }
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".collabdoc/config.toml"));
        }
        paths
    }

    /// Read and parse a config file.
    fn read_config(path: &Path) -> Result<ConfigFile, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Get the canonical config path (`~/.collabdoc/config.toml`).
    pub fn canonical_path() -> Result<PathBuf, ConfigError> {
        let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
        Ok(home.join(".collabdoc/config.toml"))
    }

    /// Write a config file atomically.
    ///
    /// Creates parent directories if needed. Writes to a temp file in the
    /// same directory, then renames it into place.
    pub fn write(path: &Path, file: &ConfigFile) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError {
                path: path.to_path_buf(),
                source: e,
            })?;
        }

        let contents =
            toml::to_string_pretty(file).map_err(|e| ConfigError::InvalidValue(e.to_string()))?;

        let temp_path = path.with_extension("toml.tmp");
        let mut temp = fs::File::create(&temp_path).map_err(|e| ConfigError::WriteError {
            path: temp_path.clone(),
            source: e,
        })?;
        temp.write_all(contents.as_bytes())
            .map_err(|e| ConfigError::WriteError {
                path: temp_path.clone(),
                source: e,
            })?;
        temp.sync_all().map_err(|e| ConfigError::WriteError {
            path: temp_path.clone(),
            source: e,
        })?;

        fs::rename(&temp_path, path).map_err(|e| ConfigError::WriteError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Override the listen address (from `--listen`).
    pub fn with_listen(mut self, listen: SocketAddr) -> Self {
        self.listen_override = Some(listen);
        self
    }

    // =========================================================================
    // Accessor methods with defaults
    // =========================================================================

    /// Address the server binds to.
    ///
    /// Defaults to `127.0.0.1:3001`.
    pub fn listen(&self) -> SocketAddr {
        self.listen_override
            .or_else(|| self.file.server.as_ref().and_then(|s| s.listen))
            .unwrap_or(DEFAULT_LISTEN)
    }

    /// Longest request line the server accepts, in bytes.
    ///
    /// Defaults to 1 MiB.
    pub fn max_frame_bytes(&self) -> usize {
        self.file
            .server
            .as_ref()
            .and_then(|s| s.max_frame_bytes)
            .unwrap_or(DEFAULT_MAX_FRAME_BYTES)
    }

    /// Per-connection cap on queued outgoing events.
    ///
    /// Defaults to 1024.
    pub fn outbox_capacity(&self) -> usize {
        self.file
            .server
            .as_ref()
            .and_then(|s| s.outbox_capacity)
            .unwrap_or(DEFAULT_OUTBOX_CAPACITY)
    }

    /// Policy for creating a branch whose name already exists.
    ///
    /// Defaults to `reject`.
    pub fn duplicate_branch(&self) -> BranchPolicy {
        self.file
            .documents
            .as_ref()
            .and_then(|d| d.duplicate_branch)
            .unwrap_or_default()
    }

    /// Grant used when a collaborator is added without explicit permissions.
    ///
    /// Defaults to `["read"]`.
    pub fn default_permissions(&self) -> PermissionSet {
        match self
            .file
            .documents
            .as_ref()
            .and_then(|d| d.default_permissions.as_ref())
        {
            Some(perms) => perms.iter().copied().collect(),
            None => PermissionSet::from_iter([Permission::Read]),
        }
    }

    /// `tracing` filter directive.
    ///
    /// Defaults to `collabdoc=info`.
    pub fn log_filter(&self) -> &str {
        self.file
            .log
            .as_ref()
            .and_then(|l| l.filter.as_deref())
            .unwrap_or(DEFAULT_LOG_FILTER)
    }

    /// Static token table (token → user id).
    pub fn tokens(&self) -> BTreeMap<String, String> {
        self.file
            .auth
            .as_ref()
            .map(|a| a.tokens.clone())
            .unwrap_or_default()
    }
}
