//! HTTP handlers: JSON in, core calls, JSON out.

use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use tracing::error;

use hexkv_node::{Node, NodeError};
use hexkv_store::StoreError;
use hexkv_types::{ApplyResult, ClientId, Command};

use crate::metrics::Metrics;

/// Request body cap for the write endpoints.
const MAX_BODY_BYTES: usize = 1 << 20;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub node: Arc<Node>,
    pub metrics: Arc<Metrics>,
}

/// Builds the node's HTTP surface.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/put", post(handle_put))
        .route("/delete", post(handle_delete))
        .route("/get", get(handle_get))
        .route("/health", get(handle_health))
        .route("/metrics", get(handle_metrics))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ============================================================================
// Wire models
// ============================================================================

#[derive(Debug, Deserialize)]
struct PutRequest {
    client: String,
    seq: u64,
    key: String,
    #[serde(default)]
    value: String,
}

#[derive(Debug, Deserialize)]
struct DeleteRequest {
    client: String,
    seq: u64,
    key: String,
}

#[derive(Debug, Deserialize)]
struct GetQuery {
    #[serde(default)]
    key: String,
}

#[derive(Debug, Serialize)]
struct WriteResponse {
    success: bool,
    #[serde(rename = "prevValue")]
    prev_value: String,
    #[serde(rename = "logIndex")]
    log_index: u64,
}

#[derive(Debug, Serialize)]
struct GetResponse {
    value: String,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    #[serde(rename = "lastIndex")]
    last_index: u64,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

impl From<&ApplyResult> for WriteResponse {
    fn from(result: &ApplyResult) -> Self {
        Self {
            success: result.success,
            prev_value: String::from_utf8_lossy(&result.prev_value).into_owned(),
            log_index: result.log_index.as_u64(),
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

async fn handle_put(State(state): State<AppState>, Json(req): Json<PutRequest>) -> Response {
    let client = match ClientId::new(req.client) {
        Ok(client) => client,
        Err(err) => return json_error(StatusCode::BAD_REQUEST, err.to_string()),
    };
    let cmd = Command::put(
        client,
        req.seq,
        Bytes::from(req.key.into_bytes()),
        Bytes::from(req.value.into_bytes()),
    );

    let outcome = exec_blocking(&state, cmd).await;
    match outcome {
        Ok(outcome) => {
            state.metrics.inc_exec();
            state.metrics.inc_put();
            if outcome.is_duplicate() {
                state.metrics.inc_dedup_hit();
            }
            (StatusCode::OK, Json(WriteResponse::from(outcome.result()))).into_response()
        }
        Err(err) => node_error(&err),
    }
}

async fn handle_delete(State(state): State<AppState>, Json(req): Json<DeleteRequest>) -> Response {
    let client = match ClientId::new(req.client) {
        Ok(client) => client,
        Err(err) => return json_error(StatusCode::BAD_REQUEST, err.to_string()),
    };
    let cmd = Command::delete(client, req.seq, Bytes::from(req.key.into_bytes()));

    let outcome = exec_blocking(&state, cmd).await;
    match outcome {
        Ok(outcome) => {
            state.metrics.inc_exec();
            state.metrics.inc_del();
            if outcome.is_duplicate() {
                state.metrics.inc_dedup_hit();
            }
            (StatusCode::OK, Json(WriteResponse::from(outcome.result()))).into_response()
        }
        Err(err) => node_error(&err),
    }
}

async fn handle_get(State(state): State<AppState>, Query(query): Query<GetQuery>) -> Response {
    if query.key.is_empty() {
        return json_error(StatusCode::BAD_REQUEST, "missing key");
    }

    match state.node.get(query.key.as_bytes()) {
        Ok(value) => {
            let body = GetResponse {
                value: String::from_utf8_lossy(&value).into_owned(),
            };
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(err) => node_error(&err),
    }
}

async fn handle_health(State(state): State<AppState>) -> Response {
    match state.node.last_index() {
        Ok(last_index) => {
            let body = HealthResponse {
                status: "ok",
                last_index: last_index.as_u64(),
            };
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(err) => node_error(&err),
    }
}

async fn handle_metrics(State(state): State<AppState>) -> Response {
    (StatusCode::OK, Json(state.metrics.snapshot())).into_response()
}

// ============================================================================
// Helpers
// ============================================================================

/// Runs `exec` off the async runtime; the append inside fsyncs.
async fn exec_blocking(
    state: &AppState,
    cmd: Command,
) -> Result<hexkv_node::ExecOutcome, NodeError> {
    let node = Arc::clone(&state.node);
    tokio::task::spawn_blocking(move || node.exec(cmd))
        .await
        .map_err(|join_err| {
            error!(%join_err, "exec task panicked");
            NodeError::LockPoisoned
        })?
}

fn node_error(err: &NodeError) -> Response {
    json_error(status_for(err), err.to_string())
}

fn status_for(err: &NodeError) -> StatusCode {
    match err {
        NodeError::InvalidCommand(_) => StatusCode::BAD_REQUEST,
        NodeError::Store(StoreError::NotFound) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn json_error(status: StatusCode, message: impl Into<String>) -> Response {
    let body = ErrorResponse {
        error: message.into(),
    };
    (status, Json(body)).into_response()
}
