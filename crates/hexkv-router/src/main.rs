//! HexKV cluster router daemon.
//!
//! A stateless front-end: clients talk to the router, the router hashes each
//! key to its owning node and proxies the request.

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use hexkv_router::{router_app, RouterState};
use hexkv_server::{cluster_config, listen_addr};

/// HexKV cluster router.
#[derive(Parser, Debug)]
#[command(name = "hexkv-router")]
#[command(about = "HexKV cluster router", long_about = None)]
struct Args {
    /// Router listen address.
    #[arg(long, default_value = ":8080")]
    addr: String,

    /// Host where the backend nodes are reachable; ports come from the
    /// cluster table.
    #[arg(long, default_value = "127.0.0.1")]
    backend_host: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();

    let nodes = cluster_config();
    anyhow::ensure!(!nodes.is_empty(), "no nodes in cluster config");
    let node_count = nodes.len();

    let state = RouterState::new(nodes, args.backend_host);

    let bind = listen_addr(&args.addr)
        .with_context(|| format!("bad listen address {:?}", args.addr))?;
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;

    info!(addr = %bind, nodes = node_count, "router serving");

    axum::serve(listener, router_app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("router error")?;

    info!("router stopped");
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
