//! serve command - Run the document server until Ctrl-C

use std::sync::Arc;

use anyhow::{Context as _, Result};
use tracing::{info, warn};

use crate::auth::StaticTokenProvider;
use crate::cli::Context;
use crate::core::config::Config;
use crate::core::registry::DocumentRegistry;
use crate::engine::EngineSettings;
use crate::logging::Verbosity;
use crate::server::Server;
use crate::session::SessionCoordinator;

/// Run the server with `config`.
pub fn serve(ctx: &Context, config: Config) -> Result<()> {
    let auth = StaticTokenProvider::from_pairs(config.tokens())
        .context("Invalid user id in [auth.tokens]")?;
    if auth.is_empty() && ctx.verbosity != Verbosity::Quiet {
        warn!("no tokens configured in [auth.tokens]; every authentication will fail");
    }

    let coordinator = Arc::new(
        SessionCoordinator::new(
            Arc::new(DocumentRegistry::new()),
            EngineSettings::from_config(&config),
            Arc::new(auth),
        )
        .with_outbox_capacity(config.outbox_capacity()),
    );

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let server = Server::bind(config.listen(), coordinator)
            .await
            .with_context(|| format!("Failed to bind {}", config.listen()))?
            .with_max_frame_bytes(config.max_frame_bytes());
        server
            .run_until(async {
                if let Err(err) = tokio::signal::ctrl_c().await {
                    warn!(error = %err, "failed to listen for Ctrl-C");
                    std::future::pending::<()>().await;
                }
                info!("received Ctrl-C");
            })
            .await
            .context("Server failed")
    })
}
