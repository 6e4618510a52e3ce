//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--config <path>`: Use this config file instead of searching
//! - `--debug`: Enable debug logging
//! - `--quiet` / `-q`: Warnings and errors only

use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;

/// collabdoc - collaborative documents with branchable history
#[derive(Parser, Debug)]
#[command(name = "collabdoc")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file to use instead of the default search path
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Warnings and errors only
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the document server
    #[command(
        name = "serve",
        long_about = "Run the document server.\n\n\
            Listens for line-delimited JSON connections and serves document, \
            branch, and live-session requests until interrupted with Ctrl-C.",
        after_help = "\
EXAMPLES:
    # Listen on the configured address (default 127.0.0.1:3001)
    collabdoc serve

    # Override the address
    collabdoc serve --listen 0.0.0.0:4000

    # Verbose logging
    RUST_LOG=collabdoc=trace collabdoc serve"
    )]
    Serve {
        /// Address to listen on (overrides server.listen)
        #[arg(long, value_name = "ADDR")]
        listen: Option<SocketAddr>,
    },

    /// Inspect or create the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the effective configuration as TOML
    Show,
    /// Print the config file in use
    Path,
    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}
