//! cli
//!
//! Command-line interface layer.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Load configuration and install logging
//! - Delegate to command handlers
//!
//! The CLI layer is thin. Document semantics live in [`crate::engine`] and
//! [`crate::session`]; the CLI only wires them to a listener.

pub mod args;
pub mod commands;

pub use args::Cli;

use std::path::PathBuf;

use anyhow::{Context as _, Result};

use crate::core::config::{Config, ConfigLoadResult};
use crate::logging::{self, Verbosity};

/// Global options shared by every command.
#[derive(Debug, Clone)]
pub struct Context {
    /// Explicit config file, if given.
    pub config_path: Option<PathBuf>,
    /// Output verbosity.
    pub verbosity: Verbosity,
}

impl Context {
    /// Load configuration honoring `--config`.
    pub fn load_config(&self) -> Result<ConfigLoadResult> {
        Config::load(self.config_path.as_deref()).context("Failed to load config")
    }
}

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub fn run() -> Result<()> {
    let cli = Cli::parse_args();
    let ctx = Context {
        config_path: cli.config.clone(),
        verbosity: Verbosity::from_flags(cli.quiet, cli.debug),
    };

    let loaded = ctx.load_config()?;
    // A second init (tests, embedding) keeps the existing subscriber.
    let _ = logging::init(ctx.verbosity, loaded.config.log_filter());

    commands::dispatch(cli.command, &ctx, loaded)
}
