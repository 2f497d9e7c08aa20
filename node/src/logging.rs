//! # Structured Logging
//!
//! One `tracing` subscriber for the whole node, writing to stderr. The
//! targets that matter:
//!
//! | Target           | What it logs                                          |
//! |------------------|-------------------------------------------------------|
//! | `pulse_protocol` | candidate blocks (debug), chain replacements (info)   |
//! | `pulse_node`     | listeners, new tips, per-submission rejections (warn) |
//! | `tower_http`     | HTTP request/response spans                           |
//!
//! Every raw TCP connection runs inside a `tcp_conn` span carrying its
//! connection id and peer address, so interleaved clients can be told
//! apart. The JSON format puts that span on every line.
//!
//! Chain state is never dumped to the console wholesale; the chain
//! observer logs a one-line summary per change and the full chain is
//! available over HTTP.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "pulse_node=info,pulse_protocol=info,tower_http=debug";

/// Log output format, selected with `--log-format`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Human-readable, colored output. Suitable for local development.
    Pretty,
    /// Machine-parseable JSON lines. Suitable for production log aggregation.
    Json,
}

/// Initialize the global tracing subscriber.
///
/// Call this exactly once, early in `main()`. Subsequent calls will panic.
///
/// `RUST_LOG` replaces [`DEFAULT_FILTER`] when set, e.g. to watch every
/// candidate block:
///
/// ```text
/// RUST_LOG=pulse_node=debug,pulse_protocol=debug
/// ```
pub fn init_logging(format: LogFormat) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    match format {
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_target(true),
                )
                .init();
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    fmt::layer()
                        .json()
                        .with_current_span(true)
                        .with_span_list(false)
                        .with_writer(std::io::stderr)
                        .with_target(true),
                )
                .init();
        }
    }

    tracing::info!(?format, "logging initialized");
}
