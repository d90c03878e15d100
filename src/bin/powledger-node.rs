#![forbid(unsafe_code)]
//! Run a powledger node: HTTP API plus the background consensus loop.

use clap::Parser;
use powledger::api::run_api_server;
use powledger::config::{load_config, load_config_from};
use powledger::error::ChainError;
use powledger::node::Node;
use powledger::peers::normalize_address;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to a TOML config file (defaults to ./config.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Port for the HTTP API
    #[arg(long)]
    port: Option<u16>,

    /// Peer to register at startup; may be repeated
    #[arg(long = "peer")]
    peers: Vec<String>,

    /// Leading zero hex characters required of a proof
    #[arg(long)]
    difficulty: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    if let Some(port) = cli.port {
        config.network.api_port = port;
    }
    if let Some(difficulty) = cli.difficulty {
        config.mining.difficulty = difficulty;
    }
    for peer in cli.peers {
        if normalize_address(&peer).is_none() {
            return Err(ChainError::InvalidAddress(peer).into());
        }
        config.network.bootstrap_peers.push(peer);
    }
    config.validate()?;

    tracing_subscriber::fmt()
        .with_max_level(config.log_level()?)
        .init();

    let node = Arc::new(Node::new(config)?);
    info!(
        difficulty = node.config.mining.difficulty,
        peers = node.peers.len(),
        "starting powledger node"
    );

    let consensus_task = node.spawn_consensus_loop();

    let signal_node = node.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            signal_node.shutdown();
        }
    });

    if let Err(e) = run_api_server(node.clone()).await {
        error!(error = %e, "API server failed");
        node.shutdown();
    }

    if let Some(task) = consensus_task {
        let _ = task.await;
    }

    info!("node stopped");
    Ok(())
}
