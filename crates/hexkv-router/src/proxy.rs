//! Proxy handlers: parse just enough to route, then forward verbatim.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::{DefaultBodyLimit, Query, State};
use axum::http::{header::CONTENT_TYPE, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use hexkv_server::{MetricsSnapshot, NodeConfig};

use crate::hash::pick_node;

/// Request body cap, matching the node's own limit.
const MAX_BODY_BYTES: usize = 1 << 20;

/// Per-node timeout for the metrics fan-out so one dead node cannot stall
/// the aggregate.
const METRICS_TIMEOUT: Duration = Duration::from_millis(500);

/// Shared router state: the node table and one HTTP client.
#[derive(Clone)]
pub struct RouterState {
    inner: Arc<RouterInner>,
}

struct RouterInner {
    nodes: Vec<NodeConfig>,
    backend_host: String,
    client: reqwest::Client,
}

impl RouterState {
    /// Builds the state over a non-empty node table.
    pub fn new(nodes: Vec<NodeConfig>, backend_host: impl Into<String>) -> Self {
        assert!(!nodes.is_empty(), "cluster table must not be empty");
        Self {
            inner: Arc::new(RouterInner {
                nodes,
                backend_host: backend_host.into(),
                client: reqwest::Client::new(),
            }),
        }
    }

    fn backend_url(&self, node: &NodeConfig, path: &str) -> String {
        format!(
            "http://{}{}{path}",
            self.inner.backend_host, node.client_addr
        )
    }
}

/// Builds the router's HTTP surface.
pub fn router_app(state: RouterState) -> Router {
    Router::new()
        .route("/put", post(handle_put))
        .route("/delete", post(handle_delete))
        .route("/get", get(handle_get))
        .route("/metrics", get(handle_metrics))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ============================================================================
// Wire models
// ============================================================================

/// The subset of a write body the router needs for placement and
/// validation; the full body is forwarded untouched.
#[derive(Debug, Deserialize)]
struct WriteEnvelope {
    #[serde(default)]
    client: String,
    #[serde(default)]
    seq: u64,
    #[serde(default)]
    key: String,
}

#[derive(Debug, Deserialize)]
struct GetQuery {
    #[serde(default)]
    key: String,
}

/// One node's entry in the aggregated metrics report.
#[derive(Debug, Serialize)]
struct NodeMetrics {
    id: String,
    addr: String,
    metrics: MetricsSnapshot,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

// ============================================================================
// Handlers
// ============================================================================

async fn handle_put(State(state): State<RouterState>, body: Bytes) -> Response {
    forward_write(&state, "/put", body).await
}

async fn handle_delete(State(state): State<RouterState>, body: Bytes) -> Response {
    forward_write(&state, "/delete", body).await
}

async fn handle_get(State(state): State<RouterState>, Query(query): Query<GetQuery>) -> Response {
    if query.key.is_empty() {
        return json_error(StatusCode::BAD_REQUEST, "missing key");
    }

    let node = pick_node(query.key.as_bytes(), &state.inner.nodes);
    info!(key = %query.key, node = %node.id, "routing get");

    let url = state.backend_url(node, "/get");
    let result = state
        .inner
        .client
        .get(url)
        .query(&[("key", query.key.as_str())])
        .send()
        .await;

    match result {
        Ok(resp) => relay(resp).await,
        Err(err) => {
            warn!(%err, node = %node.id, "backend unavailable");
            json_error(StatusCode::BAD_GATEWAY, "backend unavailable")
        }
    }
}

/// Aggregates every node's counter snapshot. Unreachable nodes are included
/// with zeroed counters rather than failing the whole report.
async fn handle_metrics(State(state): State<RouterState>) -> Response {
    let mut report = Vec::with_capacity(state.inner.nodes.len());

    for node in &state.inner.nodes {
        let url = state.backend_url(node, "/metrics");
        let snapshot = match state
            .inner
            .client
            .get(url)
            .timeout(METRICS_TIMEOUT)
            .send()
            .await
        {
            Ok(resp) => resp.json::<MetricsSnapshot>().await.unwrap_or_else(|err| {
                warn!(%err, node = %node.id, "metrics decode failed");
                MetricsSnapshot::default()
            }),
            Err(err) => {
                warn!(%err, node = %node.id, "metrics fetch failed");
                MetricsSnapshot::default()
            }
        };

        report.push(NodeMetrics {
            id: node.id.clone(),
            addr: node.client_addr.clone(),
            metrics: snapshot,
        });
    }

    (StatusCode::OK, Json(report)).into_response()
}

// ============================================================================
// Helpers
// ============================================================================

/// Validates a write body, picks the owning node, and forwards the body
/// as-is.
async fn forward_write(state: &RouterState, path: &str, body: Bytes) -> Response {
    let envelope: WriteEnvelope = match serde_json::from_slice(&body) {
        Ok(envelope) => envelope,
        Err(_) => return json_error(StatusCode::BAD_REQUEST, "invalid JSON"),
    };
    if envelope.client.is_empty() || envelope.seq == 0 || envelope.key.is_empty() {
        return json_error(StatusCode::BAD_REQUEST, "missing client/seq/key");
    }

    let node = pick_node(envelope.key.as_bytes(), &state.inner.nodes);
    info!(
        key = %envelope.key,
        client = %envelope.client,
        seq = envelope.seq,
        node = %node.id,
        "routing write"
    );

    let url = state.backend_url(node, path);
    let result = state
        .inner
        .client
        .post(url)
        .header(CONTENT_TYPE, "application/json")
        .body(body)
        .send()
        .await;

    match result {
        Ok(resp) => relay(resp).await,
        Err(err) => {
            warn!(%err, node = %node.id, "backend unavailable");
            json_error(StatusCode::BAD_GATEWAY, "backend unavailable")
        }
    }
}

/// Relays a backend response: status, content type, and body as-is.
async fn relay(resp: reqwest::Response) -> Response {
    let status = resp.status();
    let content_type = resp.headers().get(CONTENT_TYPE).cloned();

    let body = match resp.bytes().await {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!(%err, "failed reading backend response");
            return json_error(StatusCode::BAD_GATEWAY, "backend unavailable");
        }
    };

    let mut builder = Response::builder().status(status);
    if let Some(ct) = content_type {
        builder = builder.header(CONTENT_TYPE, ct);
    }
    builder
        .body(Body::from(body))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

fn json_error(status: StatusCode, message: impl Into<String>) -> Response {
    let body = ErrorResponse {
        error: message.into(),
    };
    (status, Json(body)).into_response()
}
