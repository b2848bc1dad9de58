//! Error types for journal operations.

use std::io;

use hexkv_types::CommandError;

/// Errors that can occur while appending to or replaying the journal.
///
/// During replay, everything except [`WalError::Io`] is self-healing: the
/// offending tail is truncated and the journal continues from the last good
/// frame. Anywhere else these are hard failures.
#[derive(thiserror::Error, Debug)]
pub enum WalError {
    /// Filesystem failure (open, read, write, fsync, truncate).
    #[error("filesystem error: {0}")]
    Io(#[from] io::Error),

    /// The file exists but does not start with the journal header.
    #[error("bad journal header")]
    BadHeader,

    /// Frame length prefix outside the sane range.
    #[error("frame length {len} out of range")]
    FrameLenOutOfRange { len: u32 },

    /// Stored CRC does not match the payload.
    #[error("corrupted frame: CRC mismatch")]
    CrcMismatch,

    /// The data ended before a complete frame or payload field.
    #[error("unexpected end of journal data")]
    UnexpectedEof,

    /// The client id bytes in a frame are not valid UTF-8.
    #[error("client id is not valid UTF-8")]
    ClientIdNotUtf8,

    /// The decoded command fails validation (bad instruction, bad lengths).
    #[error("invalid command: {0}")]
    InvalidCommand(#[from] CommandError),

    /// Operation on a journal that has already been closed.
    #[error("journal is closed")]
    Closed,
}
