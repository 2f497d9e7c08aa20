//! # CLI Interface
//!
//! Defines the command-line argument structure for `pulse-node` using
//! `clap` derive. Every `run` flag can also come from the environment, so a
//! deployment can be configured entirely through env vars.

use clap::{Parser, Subcommand};
use std::net::IpAddr;

use pulse_protocol::config::{
    BROADCAST_INTERVAL, DEFAULT_HTTP_PORT, DEFAULT_METRICS_PORT, DEFAULT_TCP_PORT,
};

use crate::logging::LogFormat;

/// PULSE node.
///
/// Accepts heart-rate readings over a raw line-oriented TCP socket and over
/// HTTP, appends them to a shared hash-linked chain, and streams the chain
/// back to connected clients.
#[derive(Parser, Debug)]
#[command(
    name = "pulse-node",
    about = "PULSE shared measurement chain node",
    version,
    propagate_version = true
)]
pub struct PulseNodeCli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands for the PULSE node binary.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the node.
    Run(RunArgs),
    /// Print version information and exit.
    Version,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Address every listener binds to.
    #[arg(long, env = "PULSE_BIND", default_value = "0.0.0.0")]
    pub bind: IpAddr,

    /// Port for the raw line-oriented TCP interface.
    #[arg(long, env = "PULSE_TCP_PORT", default_value_t = DEFAULT_TCP_PORT)]
    pub tcp_port: u16,

    /// Port for the HTTP/WebSocket API.
    #[arg(long, env = "PULSE_HTTP_PORT", default_value_t = DEFAULT_HTTP_PORT)]
    pub http_port: u16,

    /// Port for the Prometheus metrics endpoint.
    #[arg(long, env = "PULSE_METRICS_PORT", default_value_t = DEFAULT_METRICS_PORT)]
    pub metrics_port: u16,

    /// Seconds between full-chain broadcasts to raw TCP clients.
    #[arg(
        long,
        env = "PULSE_BROADCAST_INTERVAL",
        default_value_t = BROADCAST_INTERVAL.as_secs(),
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub broadcast_interval_secs: u64,

    /// Log output format.
    #[arg(long, env = "PULSE_LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}
