//! # REST + WebSocket API
//!
//! Builds the axum router that exposes the node's HTTP interface. All
//! endpoints share application state through axum's `State` extractor.
//!
//! ## Endpoints
//!
//! | Method | Path              | Description                             |
//! |--------|-------------------|-----------------------------------------|
//! | GET    | `/`               | Full chain, oldest first                |
//! | POST   | `/`               | Append a reading: `{"payload": 72}`     |
//! | POST   | `/chain`          | Offer a complete alternative chain      |
//! | GET    | `/blocks/:index`  | Block by index                          |
//! | GET    | `/health`         | Liveness probe                          |
//! | GET    | `/status`         | Node status summary                     |
//! | GET    | `/ws`             | WebSocket stream of chain events        |
//!
//! Rejections map to status codes: malformed input is 400, a candidate that
//! fails validation is 422, a valid candidate that does not extend the
//! chain is 409.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{
        rejection::JsonRejection,
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, warn};

use pulse_protocol::{Arbitrator, Block, Bpm, SubmitError};

use crate::metrics::SharedMetrics;

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// Shared application state available to all request handlers.
///
/// Cheap to clone: everything sits behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// The node's reported version string.
    pub version: String,
    /// The shared chain and its submission arbitrator.
    pub chain: Arc<Arbitrator>,
    /// Reference to Prometheus metrics for in-handler recording.
    pub metrics: SharedMetrics,
}

// ---------------------------------------------------------------------------
// Router Construction
// ---------------------------------------------------------------------------

/// Builds the full axum [`Router`] with all API routes, CORS, and tracing.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/", get(chain_handler).post(write_block_handler))
        .route("/chain", post(propose_chain_handler))
        .route("/blocks/:index", get(block_by_index_handler))
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        .route("/ws", get(ws_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request / Response Types
// ---------------------------------------------------------------------------

/// Body of `POST /`.
#[derive(Debug, Serialize, Deserialize)]
pub struct WriteBlockRequest {
    /// The reading to append. `BPM` is accepted as an alias.
    #[serde(alias = "BPM")]
    pub payload: Bpm,
}

/// Response payload for `GET /status`.
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    /// Node software version.
    pub version: String,
    /// Number of blocks, genesis included.
    pub chain_length: usize,
    /// Index of the current tip.
    pub tip_index: u64,
    /// Hash of the current tip.
    pub tip_hash: String,
    /// Hash of the genesis block this node started with.
    pub genesis_hash: String,
    /// ISO-8601 timestamp of the response.
    pub timestamp: String,
}

/// Response payload for `POST /chain` when the candidate is adopted.
#[derive(Debug, Serialize, Deserialize)]
pub struct ChainAcceptedResponse {
    pub chain_length: usize,
    pub tip_hash: String,
}

/// Generic error body returned by REST endpoints on failure.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    /// Machine-readable rejection reason, when the core rejected a submission.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

fn error_response(status: StatusCode, error: impl ToString, reason: Option<&str>) -> Response {
    let body = ErrorResponse {
        error: error.to_string(),
        reason: reason.map(str::to_string),
    };
    (status, Json(body)).into_response()
}

fn submit_error_response(err: &SubmitError) -> Response {
    let status = match err {
        SubmitError::PayloadParse(_) => StatusCode::BAD_REQUEST,
        SubmitError::ValidationFailed(_) => StatusCode::UNPROCESSABLE_ENTITY,
        SubmitError::ChainNotExtended { .. } => StatusCode::CONFLICT,
    };
    error_response(status, err, Some(err.reason()))
}

/// A body that never became a submission. Counted as a parse rejection so
/// the metric sees every endpoint alike.
fn malformed_body_response(state: &AppState, rejection: JsonRejection) -> Response {
    state
        .metrics
        .submissions_rejected_total
        .with_label_values(&["payload_parse"])
        .inc();
    debug!("malformed request body: {}", rejection.body_text());
    error_response(
        StatusCode::BAD_REQUEST,
        rejection.body_text(),
        Some("payload_parse"),
    )
}

/// Render `value` as indented JSON.
fn pretty_json<T: Serialize>(status: StatusCode, value: &T) -> Response {
    match serde_json::to_string_pretty(value) {
        Ok(body) => (status, [(header::CONTENT_TYPE, "application/json")], body).into_response(),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e, None),
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /` — the full chain as a pretty-printed JSON array.
async fn chain_handler(State(state): State<AppState>) -> Response {
    pretty_json(StatusCode::OK, &state.chain.snapshot())
}

/// `POST /` — append one reading on top of the current tip.
///
/// Returns 201 with the new block.
async fn write_block_handler(
    State(state): State<AppState>,
    body: Result<Json<WriteBlockRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match body {
        Ok(req) => req,
        Err(rejection) => return malformed_body_response(&state, rejection),
    };

    let started = Instant::now();
    let outcome = state.chain.append(req.payload);
    state.metrics.record_outcome(started, &outcome);

    match outcome {
        Ok(block) => pretty_json(StatusCode::CREATED, &block),
        Err(err) => {
            warn!(reason = err.reason(), error = %err, "http submission rejected");
            submit_error_response(&err)
        }
    }
}

/// `POST /chain` — offer a complete candidate chain for fork choice.
async fn propose_chain_handler(
    State(state): State<AppState>,
    body: Result<Json<Vec<Block>>, JsonRejection>,
) -> Response {
    let Json(candidate) = match body {
        Ok(candidate) => candidate,
        Err(rejection) => return malformed_body_response(&state, rejection),
    };

    let started = Instant::now();
    let outcome = state.chain.propose_chain(candidate);
    state.metrics.record_outcome(started, &outcome);

    match outcome {
        Ok(()) => {
            let snapshot = state.chain.snapshot();
            let resp = ChainAcceptedResponse {
                chain_length: snapshot.len(),
                tip_hash: snapshot.tip().hash().to_string(),
            };
            (StatusCode::OK, Json(resp)).into_response()
        }
        Err(err) => {
            warn!(reason = err.reason(), error = %err, "candidate chain rejected");
            submit_error_response(&err)
        }
    }
}

/// `GET /blocks/:index` — a single block, or 404 past the tip.
async fn block_by_index_handler(
    Path(index): Path<u64>,
    State(state): State<AppState>,
) -> Response {
    match state.chain.store().get(index) {
        Some(block) => (StatusCode::OK, Json(block)).into_response(),
        None => error_response(
            StatusCode::NOT_FOUND,
            format!("Block not found at index {}", index),
            None,
        ),
    }
}

/// `GET /health` — returns 200 if the node is alive.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

/// `GET /status` — returns node status summary.
async fn status_handler(State(state): State<AppState>) -> impl IntoResponse {
    let snapshot = state.chain.snapshot();
    let tip = snapshot.tip();
    Json(StatusResponse {
        version: state.version.clone(),
        chain_length: snapshot.len(),
        tip_index: tip.index(),
        tip_hash: tip.hash().to_string(),
        genesis_hash: state.chain.store().genesis().hash().to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// `GET /ws` — WebSocket upgrade for live chain events.
///
/// Clients receive one JSON-encoded [`ChainEvent`](pulse_protocol::ChainEvent)
/// per accepted submission. Client messages are ignored.
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws_connection(socket, state))
}

/// Drives a single WebSocket connection, forwarding chain events until the
/// client disconnects or the channel is closed.
async fn handle_ws_connection(mut socket: WebSocket, state: AppState) {
    let mut rx = state.chain.subscribe();

    loop {
        tokio::select! {
            event = rx.recv() => {
                match event {
                    Ok(ev) => {
                        let payload = match serde_json::to_string(&ev) {
                            Ok(s) => s,
                            Err(e) => {
                                warn!("failed to serialize ws event: {}", e);
                                continue;
                            }
                        };
                        if socket.send(Message::Text(payload)).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        // The next event carries the whole chain; nothing to replay.
                        debug!("ws subscriber lagged by {} events", n);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(_)) => {}
                    _ => break,
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use pulse_protocol::submission::propose;
    use pulse_protocol::{is_chain_valid, ChainStore};
    use tower::ServiceExt;

    /// Creates a test AppState over a fresh chain.
    fn test_app_state() -> AppState {
        AppState {
            version: "0.1.0-test".into(),
            chain: Arc::new(Arbitrator::new(ChainStore::with_genesis(Block::genesis_at(
                "2026-01-01T00:00:00.000000000Z",
            )))),
            metrics: Arc::new(crate::metrics::NodeMetrics::new()),
        }
    }

    async fn send(router: &Router, req: Request<Body>) -> (StatusCode, Vec<u8>) {
        let resp = router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let body = resp.into_body().collect().await.unwrap().to_bytes().to_vec();
        (status, body)
    }

    /// Sends a GET request and returns the (status, body_bytes).
    async fn get(router: &Router, path: &str) -> (StatusCode, Vec<u8>) {
        let req = Request::builder().uri(path).body(Body::empty()).unwrap();
        send(router, req).await
    }

    /// Sends a POST request with a raw body and returns (status, body_bytes).
    async fn post_raw(router: &Router, path: &str, body: Vec<u8>) -> (StatusCode, Vec<u8>) {
        let req = Request::builder()
            .method("POST")
            .uri(path)
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap();
        send(router, req).await
    }

    async fn post_json(
        router: &Router,
        path: &str,
        body: serde_json::Value,
    ) -> (StatusCode, Vec<u8>) {
        post_raw(router, path, serde_json::to_vec(&body).unwrap()).await
    }

    // -- 1. Health endpoint --------------------------------------------------

    #[tokio::test]
    async fn health_endpoint_returns_ok() {
        let router = create_router(test_app_state());
        let (status, body) = get(&router, "/health").await;

        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "ok");
    }

    // -- 2. Chain endpoint returns genesis only ------------------------------

    #[tokio::test]
    async fn chain_endpoint_returns_genesis() {
        let router = create_router(test_app_state());
        let (status, body) = get(&router, "/").await;

        assert_eq!(status, StatusCode::OK);
        let chain: Vec<Block> = serde_json::from_slice(&body).unwrap();
        assert_eq!(chain.len(), 1);
        assert_eq!(chain[0].index(), 0);
        assert_eq!(chain[0].prev_hash(), "");
    }

    // -- 3. POST / appends a block -------------------------------------------

    #[tokio::test]
    async fn write_block_appends_and_returns_201() {
        let state = test_app_state();
        let router = create_router(state.clone());
        let (status, body) = post_json(&router, "/", serde_json::json!({ "payload": 64 })).await;

        assert_eq!(status, StatusCode::CREATED);
        let block: Block = serde_json::from_slice(&body).unwrap();
        assert_eq!(block.index(), 1);
        assert_eq!(*block.payload(), 64);
        assert_eq!(block.prev_hash(), state.chain.store().genesis().hash());
        assert_eq!(state.chain.store().len(), 2);
    }

    // -- 4. Legacy BPM field name is accepted --------------------------------

    #[tokio::test]
    async fn write_block_accepts_bpm_alias() {
        let state = test_app_state();
        let router = create_router(state.clone());
        let (status, _) = post_json(&router, "/", serde_json::json!({ "BPM": 70 })).await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(*state.chain.store().tip().payload(), 70);
    }

    // -- 5. Malformed body is a 400 and leaves the chain alone ---------------

    #[tokio::test]
    async fn write_block_rejects_malformed_body() {
        let state = test_app_state();
        let router = create_router(state.clone());

        let (status, body) = post_raw(&router, "/", b"{not json".to_vec()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let err: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(err.reason.as_deref(), Some("payload_parse"));

        let (status, _) =
            post_json(&router, "/", serde_json::json!({ "payload": "seventy" })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(state.chain.store().len(), 1);
    }

    // -- 6. Block by index ---------------------------------------------------

    #[tokio::test]
    async fn block_endpoint_returns_block_or_404() {
        let state = test_app_state();
        state.chain.append(64).unwrap();
        let router = create_router(state);

        let (status, body) = get(&router, "/blocks/1").await;
        assert_eq!(status, StatusCode::OK);
        let block: Block = serde_json::from_slice(&body).unwrap();
        assert_eq!(*block.payload(), 64);

        let (status, body) = get(&router, "/blocks/999").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let err: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert!(err.error.contains("not found"));
    }

    // -- 7. Status reflects the chain ----------------------------------------

    #[tokio::test]
    async fn status_endpoint_reports_tip() {
        let state = test_app_state();
        let block = state.chain.append(64).unwrap();
        let router = create_router(state);

        let (status, body) = get(&router, "/status").await;
        assert_eq!(status, StatusCode::OK);
        let resp: StatusResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(resp.chain_length, 2);
        assert_eq!(resp.tip_index, 1);
        assert_eq!(resp.tip_hash, block.hash());
        assert_eq!(resp.version, "0.1.0-test");
    }

    // -- 8. Longer candidate chain is adopted --------------------------------

    #[tokio::test]
    async fn propose_chain_adopts_longer_candidate() {
        let state = test_app_state();
        let mut candidate = state.chain.snapshot().to_vec();
        for bpm in [64, 70] {
            let next = propose(candidate.last().unwrap(), bpm);
            candidate.push(next);
        }
        let router = create_router(state.clone());

        let (status, body) =
            post_raw(&router, "/chain", serde_json::to_vec(&candidate).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        let resp: ChainAcceptedResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(resp.chain_length, 3);
        assert!(is_chain_valid(&state.chain.snapshot(), state.chain.store().genesis()));
    }

    // -- 9. Stale candidate is a 409 -----------------------------------------

    #[tokio::test]
    async fn propose_chain_stale_candidate_conflicts() {
        let state = test_app_state();
        let base = state.chain.snapshot();
        state.chain.append(64).unwrap();

        let mut stale = base.to_vec();
        stale.push(propose(base.tip(), 70));
        let router = create_router(state.clone());

        let (status, body) = post_raw(&router, "/chain", serde_json::to_vec(&stale).unwrap()).await;
        assert_eq!(status, StatusCode::CONFLICT);
        let err: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(err.reason.as_deref(), Some("chain_not_extended"));
        assert_eq!(*state.chain.store().tip().payload(), 64);
    }

    // -- 10. Tampered candidate is a 422 -------------------------------------

    #[tokio::test]
    async fn propose_chain_tampered_candidate_is_unprocessable() {
        let state = test_app_state();
        let mut candidate = state.chain.snapshot().to_vec();
        for bpm in [64, 70] {
            let next = propose(candidate.last().unwrap(), bpm);
            candidate.push(next);
        }
        let mut value = serde_json::to_value(&candidate).unwrap();
        value[2]["payload"] = serde_json::json!(200);
        let router = create_router(state.clone());

        let (status, body) = post_json(&router, "/chain", value).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        let err: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(err.reason.as_deref(), Some("validation_failed"));
        assert_eq!(state.chain.store().len(), 1);
    }

    // -- 11. Malformed candidate chain is a 400 and is counted ---------------

    #[tokio::test]
    async fn propose_chain_rejects_malformed_body() {
        let state = test_app_state();
        let router = create_router(state.clone());

        let (status, body) = post_raw(&router, "/chain", b"[{\"index\":".to_vec()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let err: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(err.reason.as_deref(), Some("payload_parse"));
        assert_eq!(
            state
                .metrics
                .submissions_rejected_total
                .with_label_values(&["payload_parse"])
                .get(),
            1
        );
        assert_eq!(state.chain.store().len(), 1);
    }

    // -- 12. Metrics see accepted and rejected submissions -------------------

    #[tokio::test]
    async fn submissions_are_counted() {
        let state = test_app_state();
        let router = create_router(state.clone());
        post_json(&router, "/", serde_json::json!({ "payload": 64 })).await;
        post_raw(&router, "/", b"garbage".to_vec()).await;

        assert_eq!(state.metrics.submissions_accepted_total.get(), 1);
        assert_eq!(
            state
                .metrics
                .submissions_rejected_total
                .with_label_values(&["payload_parse"])
                .get(),
            1
        );
    }
}
