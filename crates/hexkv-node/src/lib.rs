//! # hexkv-node: The storage node
//!
//! A [`Node`] binds exactly one journal and one store and is the only
//! component allowed to touch either. It is the serialization point for
//! writes: every command goes journal-first, fsynced, then into the store,
//! under a single node-wide write lock.
//!
//! ```text
//! Command ──► Node::exec
//!                │
//!                ├── dedup peek (store lock, released)  ─► cached result
//!                │
//!                ├── Wal::append  (encode + write + fsync)
//!                │
//!                └── Store::apply (store lock)           ─► ApplyResult
//! ```
//!
//! Reads bypass the node lock entirely and go straight to the store, so an
//! fsync in flight never blocks a `get`.

mod error;
mod node;

pub use error::NodeError;
pub use node::{ExecOutcome, Node};

#[cfg(test)]
mod tests;
