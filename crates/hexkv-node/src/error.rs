//! Error types for node operations.

use std::io;
use std::path::PathBuf;

use hexkv_store::StoreError;
use hexkv_types::CommandError;
use hexkv_wal::WalError;

/// Errors surfaced by the node. Journal and store errors pass through
/// unchanged; the node wraps nothing by default.
#[derive(thiserror::Error, Debug)]
pub enum NodeError {
    /// Something exists at the data path but it is not a directory.
    #[error("data path is not a directory: {path}")]
    NotADirectory { path: PathBuf },

    /// Journal failure (append, replay, open, close).
    #[error(transparent)]
    Wal(#[from] WalError),

    /// Store failure (out-of-order apply, missing key).
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Command rejected at the exec boundary; the journal is untouched.
    #[error("invalid command: {0}")]
    InvalidCommand(#[from] CommandError),

    /// Filesystem failure outside the journal (data dir handling).
    #[error("filesystem error: {0}")]
    Io(#[from] io::Error),

    /// A previous holder of the node lock panicked.
    #[error("node lock poisoned")]
    LockPoisoned,
}

impl NodeError {
    /// True for errors caused by the request rather than the node.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            NodeError::InvalidCommand(_) | NodeError::Store(StoreError::NotFound)
        )
    }
}
