//! config command - Show, locate, or create the configuration file

use anyhow::{bail, Context as _, Result};

use crate::cli::Context;
use crate::core::config::schema::{ConfigFile, DocumentsConfig, LogConfig, ServerConfig};
use crate::core::config::{
    Config, ConfigLoadResult, DEFAULT_LISTEN, DEFAULT_LOG_FILTER, DEFAULT_MAX_FRAME_BYTES,
    DEFAULT_OUTBOX_CAPACITY,
};
use crate::core::graph::BranchPolicy;
use crate::core::types::Permission;
use crate::logging::Verbosity;

/// Print the effective configuration, defaults filled in, as TOML.
///
/// Token values are never printed, only the user ids they map to.
pub fn show(loaded: &ConfigLoadResult) -> Result<()> {
    let config = &loaded.config;
    let effective = ConfigFile {
        server: Some(ServerConfig {
            listen: Some(config.listen()),
            max_frame_bytes: Some(config.max_frame_bytes()),
            outbox_capacity: Some(config.outbox_capacity()),
        }),
        documents: Some(DocumentsConfig {
            duplicate_branch: Some(config.duplicate_branch()),
            default_permissions: Some(config.default_permissions().iter().collect()),
        }),
        log: Some(LogConfig {
            filter: Some(config.log_filter().to_string()),
        }),
        auth: None,
    };
    let rendered = toml::to_string_pretty(&effective).context("Failed to render config")?;

    match &loaded.path {
        Some(path) => println!("# Loaded from {}", path.display()),
        None => println!("# No config file found; showing defaults"),
    }
    print!("{rendered}");

    let tokens = config.tokens();
    if !tokens.is_empty() {
        println!();
        println!("# {} token(s) configured for:", tokens.len());
        for user in tokens.values() {
            println!("#   {user}");
        }
    }
    Ok(())
}

/// Print the config file in use.
pub fn path(loaded: &ConfigLoadResult) -> Result<()> {
    match &loaded.path {
        Some(path) => println!("{}", path.display()),
        None => bail!("No config file found. Run 'collabdoc config init' to create one."),
    }
    Ok(())
}

/// Write a default config file to `--config` or the canonical path.
pub fn init(ctx: &Context, force: bool) -> Result<()> {
    let path = match &ctx.config_path {
        Some(path) => path.clone(),
        None => Config::canonical_path().context("Failed to resolve config path")?,
    };
    if path.exists() && !force {
        bail!(
            "Config file already exists at {}. Use --force to overwrite.",
            path.display()
        );
    }

    let file = ConfigFile {
        server: Some(ServerConfig {
            listen: Some(DEFAULT_LISTEN),
            max_frame_bytes: Some(DEFAULT_MAX_FRAME_BYTES),
            outbox_capacity: Some(DEFAULT_OUTBOX_CAPACITY),
        }),
        documents: Some(DocumentsConfig {
            duplicate_branch: Some(BranchPolicy::Reject),
            default_permissions: Some(vec![Permission::Read]),
        }),
        log: Some(LogConfig {
            filter: Some(DEFAULT_LOG_FILTER.to_string()),
        }),
        auth: None,
    };
    Config::write(&path, &file).context("Failed to write config")?;

    if ctx.verbosity != Verbosity::Quiet {
        println!("Wrote {}", path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_writes_loadable_file_and_refuses_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/config.toml");
        let ctx = Context {
            config_path: Some(path.clone()),
            verbosity: Verbosity::Quiet,
        };

        init(&ctx, false).unwrap();
        let loaded = Config::load(Some(&path)).unwrap();
        assert_eq!(loaded.config.listen(), DEFAULT_LISTEN);
        assert_eq!(loaded.config.duplicate_branch(), BranchPolicy::Reject);

        assert!(init(&ctx, false).is_err());
        assert!(init(&ctx, true).is_ok());
    }
}
