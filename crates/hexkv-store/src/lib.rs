//! # hexkv-store: Authoritative node state
//!
//! The [`Store`] owns a node's in-memory truth: the key/value map, the
//! per-client dedup table, and the `last_applied` counter. Commands reach it
//! exactly once per log index via [`Store::apply`]; point reads go through
//! [`Store::get`].
//!
//! # Duplicate Detection
//!
//! ```text
//! Command (clientId, seq)
//!         │
//!         ▼
//! ┌───────────────────┐
//! │ Check Dedup Table │──► seq ≤ last seen? Return cached result
//! └─────────┬─────────┘
//!           │ fresh
//!           ▼
//! ┌───────────────────┐
//! │  Mutate kv map    │
//! └─────────┬─────────┘
//!           │
//!           ▼
//! ┌───────────────────┐
//! │ Record in Table   │
//! └───────────────────┘
//! ```
//!
//! The table is rebuilt from the journal on startup: replay pushes every
//! recovered record back through `apply`, so a duplicate whose original
//! write preceded a crash is still answered from the cache after reopen.

mod dedup;
mod error;
mod store;

pub use dedup::{DedupEntry, DedupTable};
pub use error::StoreError;
pub use store::Store;
