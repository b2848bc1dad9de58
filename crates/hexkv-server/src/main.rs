//! HexKV storage node daemon.
//!
//! Boots the node (journal open + replay), serves the HTTP surface, and on
//! SIGINT/SIGTERM drains in-flight requests before flushing and closing the
//! journal.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use hexkv_node::Node;
use hexkv_server::{app, config_for_id, listen_addr, AppState, Metrics};

/// HexKV storage node daemon.
#[derive(Parser, Debug)]
#[command(name = "hexkv-server")]
#[command(about = "HexKV storage node daemon", long_about = None)]
struct Args {
    /// Node id from the static cluster table (n1..n6); overrides
    /// --addr and --data.
    #[arg(long)]
    node_id: Option<String>,

    /// HTTP listen address.
    #[arg(long, default_value = ":8090")]
    addr: String,

    /// Data directory.
    #[arg(long, default_value = "./data")]
    data: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();
    let (addr, data_dir) = match &args.node_id {
        Some(id) => {
            let cfg = config_for_id(id).with_context(|| format!("unknown node id {id:?}"))?;
            (cfg.client_addr, cfg.data_dir)
        }
        None => (args.addr.clone(), args.data.clone().into()),
    };

    // Boot the node: journal open + replay before we accept any traffic.
    let node = Arc::new(Node::open(&data_dir).context("failed to open node")?);
    let metrics = Arc::new(Metrics::new());

    let state = AppState {
        node: Arc::clone(&node),
        metrics,
    };

    let bind = listen_addr(&addr).with_context(|| format!("bad listen address {addr:?}"))?;
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;

    info!(addr = %bind, data_dir = %data_dir.display(), "serving");

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    node.close().context("failed to close node")?;
    info!("node closed, bye");
    Ok(())
}

/// Resolves on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        _ = terminate => {}
    }
    info!("shutting down gracefully");
}
