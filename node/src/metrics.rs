//! # Prometheus Metrics
//!
//! Exposes operational metrics for the node. Scraped by Prometheus at the
//! `/metrics` HTTP endpoint on the configured metrics port.
//!
//! All metrics are registered in a dedicated [`prometheus::Registry`] so they
//! do not collide with any default global registry consumers.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;
use std::time::Instant;

use pulse_protocol::SubmitError;

/// Holds all Prometheus metric handles for the node.
#[derive(Clone)]
pub struct NodeMetrics {
    /// Prometheus registry that owns all metrics below.
    registry: Registry,
    /// Total number of submissions that extended the chain.
    pub submissions_accepted_total: IntCounter,
    /// Rejected submissions, labelled by `reason`.
    pub submissions_rejected_total: IntCounterVec,
    /// Current chain length, genesis included.
    pub chain_length: IntGauge,
    /// Raw TCP clients currently connected.
    pub connected_clients: IntGauge,
    /// Time from receiving a submission to its accept/reject decision.
    pub submission_latency_seconds: Histogram,
}

impl NodeMetrics {
    /// Creates and registers all metrics. Call once at startup.
    pub fn new() -> Self {
        let registry = Registry::new_custom(Some("pulse".into()), None)
            .expect("failed to create prometheus registry");

        let submissions_accepted_total = IntCounter::new(
            "submissions_accepted_total",
            "Total number of submissions that extended the chain",
        )
        .expect("metric creation");
        registry
            .register(Box::new(submissions_accepted_total.clone()))
            .expect("metric registration");

        let submissions_rejected_total = IntCounterVec::new(
            Opts::new(
                "submissions_rejected_total",
                "Total number of rejected submissions by reason",
            ),
            &["reason"],
        )
        .expect("metric creation");
        registry
            .register(Box::new(submissions_rejected_total.clone()))
            .expect("metric registration");

        let chain_length = IntGauge::new("chain_length", "Number of blocks in the canonical chain")
            .expect("metric creation");
        registry
            .register(Box::new(chain_length.clone()))
            .expect("metric registration");

        let connected_clients =
            IntGauge::new("connected_clients", "Number of connected raw TCP clients")
                .expect("metric creation");
        registry
            .register(Box::new(connected_clients.clone()))
            .expect("metric registration");

        let submission_latency_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "submission_latency_seconds",
                "Time to decide on a submission in seconds",
            )
            .buckets(vec![
                0.000_01, 0.000_05, 0.000_1, 0.000_5, 0.001, 0.005, 0.01, 0.05, 0.1,
            ]),
        )
        .expect("metric creation");
        registry
            .register(Box::new(submission_latency_seconds.clone()))
            .expect("metric registration");

        chain_length.set(1);

        Self {
            registry,
            submissions_accepted_total,
            submissions_rejected_total,
            chain_length,
            connected_clients,
            submission_latency_seconds,
        }
    }

    /// Record how a submission ended and how long the decision took.
    pub fn record_outcome<T>(&self, started: Instant, outcome: &Result<T, SubmitError>) {
        self.submission_latency_seconds
            .observe(started.elapsed().as_secs_f64());
        match outcome {
            Ok(_) => self.submissions_accepted_total.inc(),
            Err(err) => self
                .submissions_rejected_total
                .with_label_values(&[err.reason()])
                .inc(),
        }
    }

    /// Encodes all registered metrics into the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer).expect("prometheus output is valid utf-8"))
    }
}

/// Shared metrics state passed to axum handlers and transport tasks.
pub type SharedMetrics = Arc<NodeMetrics>;

/// Axum handler that renders `/metrics` in Prometheus text format.
pub async fn metrics_handler(
    axum::extract::State(metrics): axum::extract::State<SharedMetrics>,
) -> impl IntoResponse {
    match metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics encoding failed").into_response()
        }
    }
}
