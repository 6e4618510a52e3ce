//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Async Commands
//!
//! `serve` owns the network runtime. The dispatch function stays sync and the
//! handler builds a tokio runtime for the duration of the command.

mod config_cmd;
mod serve;

pub use serve::serve;

use anyhow::Result;

use super::args::{Command, ConfigAction};
use super::Context;
use crate::core::config::ConfigLoadResult;

/// Dispatch a parsed command to its handler.
pub fn dispatch(command: Command, ctx: &Context, loaded: ConfigLoadResult) -> Result<()> {
    match command {
        Command::Serve { listen } => {
            let config = match listen {
                Some(addr) => loaded.config.with_listen(addr),
                None => loaded.config,
            };
            serve(ctx, config)
        }
        Command::Config { action } => match action {
            ConfigAction::Show => config_cmd::show(&loaded),
            ConfigAction::Path => config_cmd::path(&loaded),
            ConfigAction::Init { force } => config_cmd::init(ctx, force),
        },
    }
}
