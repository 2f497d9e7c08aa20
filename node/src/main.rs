// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # PULSE Node
//!
//! Entry point for the `pulse-node` binary. Parses CLI arguments, initializes
//! logging and metrics, and serves the chain over three listeners:
//!
//! - raw TCP: line-oriented readings in, periodic full-chain JSON out
//! - HTTP/WS: the REST API and the live event stream
//! - metrics: Prometheus scrape endpoint

mod api;
mod cli;
mod logging;
mod metrics;
mod tcp;

use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::sync::broadcast::error::RecvError;

use pulse_protocol::{Arbitrator, ChainStore};

use cli::{Commands, PulseNodeCli};
use metrics::{NodeMetrics, SharedMetrics};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = PulseNodeCli::parse();

    match cli.command {
        Commands::Run(args) => run_node(args).await,
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Starts the node: all three listeners plus the chain observer.
async fn run_node(args: cli::RunArgs) -> Result<()> {
    logging::init_logging(args.log_format);

    tracing::info!(
        bind = %args.bind,
        tcp_port = args.tcp_port,
        http_port = args.http_port,
        metrics_port = args.metrics_port,
        broadcast_interval_secs = args.broadcast_interval_secs,
        "starting pulse-node"
    );

    // --- Chain ---
    let chain: Arc<Arbitrator> = Arc::new(Arbitrator::new(ChainStore::new()));
    tracing::info!(
        genesis = %chain.store().genesis().hash(),
        "chain initialized"
    );

    // --- Metrics ---
    let node_metrics = Arc::new(NodeMetrics::new());

    // --- Chain observer ---
    let observer = tokio::spawn(observe_chain(
        Arc::clone(&chain),
        Arc::clone(&node_metrics),
    ));

    // --- Raw TCP server ---
    let tcp_addr = SocketAddr::new(args.bind, args.tcp_port);
    let tcp_listener = tokio::net::TcpListener::bind(tcp_addr)
        .await
        .with_context(|| format!("failed to bind TCP listener on {}", tcp_addr))?;
    tracing::info!("TCP server listening on {}", tcp_addr);
    let tcp_ctx = tcp::TcpContext {
        chain: Arc::clone(&chain),
        metrics: Arc::clone(&node_metrics),
        broadcast_interval: Duration::from_secs(args.broadcast_interval_secs),
    };

    // --- API server ---
    let app_state = api::AppState {
        version: format!(
            "{} (protocol {})",
            env!("CARGO_PKG_VERSION"),
            pulse_protocol::config::PROTOCOL_VERSION,
        ),
        chain: Arc::clone(&chain),
        metrics: Arc::clone(&node_metrics),
    };
    let api_router = api::create_router(app_state);
    let api_addr = SocketAddr::new(args.bind, args.http_port);
    let api_listener = tokio::net::TcpListener::bind(api_addr)
        .await
        .with_context(|| format!("failed to bind HTTP listener on {}", api_addr))?;
    tracing::info!("HTTP/API server listening on {}", api_addr);

    // --- Metrics server ---
    let metrics_router = axum::Router::new()
        .route("/metrics", axum::routing::get(metrics::metrics_handler))
        .with_state(Arc::clone(&node_metrics));
    let metrics_addr = SocketAddr::new(args.bind, args.metrics_port);
    let metrics_listener = tokio::net::TcpListener::bind(metrics_addr)
        .await
        .with_context(|| format!("failed to bind metrics listener on {}", metrics_addr))?;
    tracing::info!("Metrics server listening on {}", metrics_addr);

    // --- Serve ---
    tokio::select! {
        _ = tcp::serve(tcp_listener, tcp_ctx) => {}
        res = axum::serve(api_listener, api_router) => {
            if let Err(e) = res {
                tracing::error!("API server error: {}", e);
            }
        }
        res = axum::serve(metrics_listener, metrics_router) => {
            if let Err(e) = res {
                tracing::error!("Metrics server error: {}", e);
            }
        }
        res = shutdown_signal() => {
            match res {
                Ok(()) => tracing::info!("shutdown signal received, stopping"),
                Err(e) => tracing::error!("signal handler failed: {}", e),
            }
        }
    }

    observer.abort();
    tracing::info!(
        length = chain.store().len(),
        "pulse-node stopped"
    );
    Ok(())
}

/// Follows chain changes: keeps the length gauge current and logs each new
/// tip. Falls back to reading the store directly after lagging.
async fn observe_chain(chain: Arc<Arbitrator>, metrics: SharedMetrics) {
    let mut events = chain.subscribe();
    loop {
        match events.recv().await {
            Ok(event) => {
                metrics.chain_length.set(event.length() as i64);
                let tip = event.tip();
                tracing::info!(
                    index = tip.index(),
                    payload = *tip.payload(),
                    hash = %tip.hash(),
                    length = event.length(),
                    "chain extended"
                );
            }
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "chain observer lagged");
                metrics.chain_length.set(chain.store().len() as i64);
            }
            Err(RecvError::Closed) => break,
        }
    }
}

/// Prints version information to stdout.
fn print_version() {
    println!("pulse-node {}", env!("CARGO_PKG_VERSION"));
    println!("protocol   {}", pulse_protocol::config::PROTOCOL_VERSION);
    println!("hash       {}", pulse_protocol::config::HASH_FUNCTION);
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
///
/// On non-Unix platforms, only Ctrl+C is supported.
async fn shutdown_signal() -> std::io::Result<()> {
    let ctrl_c = signal::ctrl_c();

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())?
            .recv()
            .await;
        Ok::<(), std::io::Error>(())
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<std::io::Result<()>>();

    tokio::select! {
        res = ctrl_c => res,
        res = terminate => res,
    }
}
