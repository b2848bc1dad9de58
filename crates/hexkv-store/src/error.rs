//! Error types for store operations.

use hexkv_types::LogIndex;

/// Errors that can occur while applying commands or reading.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Read of an absent key. Ordinary, surfaced to the caller.
    #[error("key not found")]
    NotFound,

    /// Apply called with a log index that is not `last_applied + 1`.
    /// An invariant violation: the node must never call out of order.
    #[error("out-of-order apply: expected index {expected}, got {got}")]
    OutOfOrderApply { expected: LogIndex, got: LogIndex },

    /// A previous holder of the store lock panicked.
    #[error("store lock poisoned")]
    LockPoisoned,
}
