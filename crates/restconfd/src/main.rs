//! restconfd - RESTCONF Gateway Daemon
//!
//! Serves the RESTCONF data and stream resources over an in-memory tree
//! engine.
//!
//! Usage:
//!   restconfd [OPTIONS] [config.toml]
//!
//! Options:
//!   --data <file.json>  Seed the datastore from a JSON document
//!
//! If no config file is provided, defaults are used (port 8181, root
//! `/onos/restconf`).

mod config;
mod memory;

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use restconf_api::{create_router, AppState, EventBroadcastHub, RestconfService};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::memory::MemoryEngine;

/// Parsed command-line arguments
#[derive(Debug, Default, PartialEq, Eq)]
struct Args {
    /// Server config file (TOML)
    config_path: Option<PathBuf>,
    /// Initial datastore content (JSON)
    data_path: Option<PathBuf>,
}

fn parse_args<I: IntoIterator<Item = String>>(args: I) -> anyhow::Result<Args> {
    let mut result = Args::default();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--data" | "-d" => {
                let path = args.next().context("Missing argument for --data")?;
                result.data_path = Some(PathBuf::from(path));
            }
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            arg if !arg.starts_with('-') => {
                // Positional argument = config file
                result.config_path = Some(PathBuf::from(arg));
            }
            _ => {
                tracing::warn!("Unknown argument: {}", arg);
            }
        }
    }

    Ok(result)
}

fn print_help() {
    eprintln!(
        r#"restconfd - RESTCONF Gateway Daemon

Usage: restconfd [OPTIONS] [config.toml]

Options:
  -d, --data <file.json>  Seed the in-memory datastore from a JSON document
  -h, --help              Print this help message

Examples:
  # Run with defaults
  restconfd

  # Run with config file and initial data
  restconfd --data datastore.json restconfd.toml
"#
    );
}

/// Load the initial datastore content
fn load_data(path: &Path) -> anyhow::Result<MemoryEngine> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read data file {}", path.display()))?;
    let document: serde_json::Value = serde_json::from_str(&text)
        .with_context(|| format!("Invalid JSON in {}", path.display()))?;
    let nodes = restconf_conv::json_to_tree(&document)?;
    tracing::info!("Loaded {} top-level nodes from {}", nodes.len(), path.display());
    Ok(MemoryEngine::with_data(nodes))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "restconfd=info,restconf_api=info,restconf_core=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting restconfd (RESTCONF Gateway Daemon)");

    // Parse command-line arguments
    let args = parse_args(std::env::args().skip(1))?;

    let config = match args.config_path {
        Some(ref path) => {
            tracing::info!("Loading config from: {}", path.display());
            Config::load(path)?
        }
        None => {
            tracing::info!("No config file provided, using defaults");
            Config::default()
        }
    };

    let engine = match args.data_path {
        Some(ref path) => load_data(path)?,
        None => MemoryEngine::default(),
    };

    let hub = EventBroadcastHub::new(config.streams.clone());
    let service = RestconfService::new(
        Arc::new(engine),
        hub.clone(),
        config.server.service_config(),
    );
    service.start_notification_bridge();

    tracing::info!(
        root = %service.root_path(),
        workers = config.streams.worker_pool_size,
        overflow = ?config.streams.overflow,
        "RESTCONF service ready"
    );

    // Create the router
    let app = create_router(AppState::new(service));

    // Bind to address
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on http://{}", addr);

    // Run the server
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for ctrl-c: {}", e);
            }
            tracing::info!("Shutting down");
            // Ends every open event stream so the server can drain
            hub.shutdown();
        })
        .await?;

    Ok(())
}
