//! # hexkv-server: Node transport
//!
//! The HTTP/JSON face of a storage node. A thin layer: handlers translate
//! request bodies into [`hexkv_node::Node`] calls and core errors into
//! status codes, and bump the request counters. All durability and ordering
//! guarantees live below, in the node.
//!
//! ## Endpoints
//!
//! - `POST /put` — `{client, seq, key, value}` → `{success, prevValue, logIndex}`
//! - `POST /delete` — `{client, seq, key}` → `{success, prevValue, logIndex}`
//! - `GET /get?key=K` — `{value}`
//! - `GET /health` — `{status, lastIndex}`
//! - `GET /metrics` — counter snapshot

pub mod config;
pub mod http;
pub mod metrics;

pub use config::{cluster_config, config_for_id, listen_addr, NodeConfig};
pub use http::{app, AppState};
pub use metrics::{Metrics, MetricsSnapshot};
