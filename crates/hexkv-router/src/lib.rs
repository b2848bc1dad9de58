//! # hexkv-router: Stateless routing tier
//!
//! The cluster's front door. Holds no state beyond the static node table:
//! each request's key is hashed with 32-bit FNV-1a and the command is
//! proxied to the owning node, with the backend's status and body relayed
//! verbatim. `GET /metrics` fans out to every node and aggregates.
//!
//! The core does not depend on this placement choice; any stable
//! deterministic mapping from key to node would do.

pub mod hash;
pub mod proxy;

pub use hash::{fnv1a_32, pick_node};
pub use proxy::{router_app, RouterState};
