//! logging
//!
//! Structured logging setup.
//!
//! Logs go to stderr through a `tracing-subscriber` fmt layer. The filter
//! comes from, in order: `RUST_LOG`, `--quiet`/`--debug`, the config's
//! `log.filter`, and finally [`DEFAULT_LOG_FILTER`].

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{fmt, EnvFilter};

pub use crate::core::config::DEFAULT_LOG_FILTER;

/// Output verbosity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// Warnings and errors only
    Quiet,
    /// Configured filter
    Normal,
    /// Everything from this crate
    Debug,
}

impl Verbosity {
    /// Create verbosity from flags. `quiet` wins over `debug`.
    pub fn from_flags(quiet: bool, debug: bool) -> Self {
        if quiet {
            Verbosity::Quiet
        } else if debug {
            Verbosity::Debug
        } else {
            Verbosity::Normal
        }
    }
}

/// The filter directive for `verbosity`, ignoring `RUST_LOG`.
pub fn directive(verbosity: Verbosity, configured: &str) -> String {
    match verbosity {
        Verbosity::Quiet => "collabdoc=warn".to_string(),
        Verbosity::Debug => "collabdoc=debug".to_string(),
        Verbosity::Normal => configured.to_string(),
    }
}

/// Install the global subscriber.
///
/// # Errors
///
/// Fails if a global subscriber is already installed.
pub fn init(verbosity: Verbosity, configured: &str) -> Result<(), TryInitError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(directive(verbosity, configured)));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init()
}
