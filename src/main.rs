//! Edge server for the multi-site content platform.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ───────────────▶ http server ──▶ dispatch pipeline ──┬─▶ redirect / health / stub
//!                      (request id,    (sites, agent,      │
//!                       trace, panic,   identity tokens)   ├─▶ upstream client ──▶ dynamic / mini backend
//!                       deadline)                          │
//!                                                          └─▶ asset store ──▶ static files
//!
//!     Cross-cutting: config, observability (logs, metrics), lifecycle (shutdown)
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use site_edge::assets::FsAssetStore;
use site_edge::config::{resolve_config, Stage};
use site_edge::lifecycle::{forward_signals, Shutdown};
use site_edge::observability::{logging, metrics};
use site_edge::sites::SiteRegistry;
use site_edge::EdgeServer;

#[derive(Debug, Parser)]
#[command(name = "site-edge", version, about = "Edge server for the multi-site content platform")]
struct Args {
    /// Path to the TOML configuration file. Defaults apply when omitted.
    #[arg(short, long, env = "EDGE_CONFIG")]
    config: Option<PathBuf>,

    /// Deployment stage, overriding the configuration file.
    #[arg(long, env = "STAGE", value_enum)]
    stage: Option<Stage>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = resolve_config(args.config.as_deref(), args.stage)?;

    logging::init(
        &config.observability.log_level,
        config.observability.log_format,
    );
    tracing::info!(version = env!("CARGO_PKG_VERSION"), stage = %config.stage, "site-edge starting");

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let registry = if config.sites.is_empty() {
        SiteRegistry::with_defaults(&config.routing.host_aliases)?
    } else {
        SiteRegistry::new(config.sites.clone(), &config.routing.host_aliases)?
    };
    let assets = Arc::new(FsAssetStore::new(&config.assets.root));

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let server = EdgeServer::new(config, Arc::new(registry), assets)?;

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(forward_signals(shutdown));

    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
