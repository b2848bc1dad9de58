//! # hexkv-types: Core types for HexKV
//!
//! This crate contains the value types shared across the HexKV system:
//! - Client commands ([`Command`], [`Operation`])
//! - Apply results ([`ApplyResult`])
//! - Identifiers ([`ClientId`], [`LogIndex`])
//! - Wire limits and command validation ([`CommandError`])

use std::fmt::Display;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

// ============================================================================
// Wire limits
// ============================================================================

/// Maximum client id length in bytes (must fit in a u8 length prefix).
pub const MAX_CLIENT_ID_LEN: usize = 255;

/// Maximum key length in bytes (must fit in a u16 length prefix).
pub const MAX_KEY_LEN: usize = 65_535;

/// Maximum value length in bytes (must fit in a u32 length prefix).
pub const MAX_VALUE_LEN: u64 = u32::MAX as u64;

// ============================================================================
// Identifiers
// ============================================================================

/// Opaque per-client identity used for sequence deduplication.
///
/// Validated on construction: 1..=255 bytes.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClientId(String);

impl ClientId {
    /// Creates a client id, rejecting empty or oversized inputs.
    ///
    /// # Errors
    ///
    /// - [`CommandError::EmptyClientId`] for a zero-length id
    /// - [`CommandError::ClientIdTooLong`] beyond [`MAX_CLIENT_ID_LEN`] bytes
    pub fn new(id: impl Into<String>) -> Result<Self, CommandError> {
        let id = id.into();
        if id.is_empty() {
            return Err(CommandError::EmptyClientId);
        }
        if id.len() > MAX_CLIENT_ID_LEN {
            return Err(CommandError::ClientIdTooLong { len: id.len() });
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Position of a record in the command journal.
///
/// Indexes are one-based and gap-free: the first committed command has
/// index 1, and `ZERO` means "nothing applied yet".
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct LogIndex(u64);

impl LogIndex {
    pub const ZERO: LogIndex = LogIndex(0);

    pub fn new(index: u64) -> Self {
        Self(index)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }

    /// The index the next committed command will receive.
    pub fn next(&self) -> LogIndex {
        LogIndex(self.0 + 1)
    }
}

impl Display for LogIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for LogIndex {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<LogIndex> for u64 {
    fn from(index: LogIndex) -> Self {
        index.0
    }
}

// ============================================================================
// Commands
// ============================================================================

/// The mutation a command performs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Insert or overwrite a key.
    Put { key: Bytes, value: Bytes },

    /// Remove a key.
    Delete { key: Bytes },
}

impl Operation {
    /// Returns the key this operation targets.
    pub fn key(&self) -> &Bytes {
        match self {
            Operation::Put { key, .. } | Operation::Delete { key } => key,
        }
    }

    /// Short lowercase name for logs and counters.
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Put { .. } => "put",
            Operation::Delete { .. } => "delete",
        }
    }
}

/// A client command: one mutation, stamped with the client's identity and a
/// per-client monotonically increasing sequence number.
///
/// Commands are immutable once constructed. The sequence number drives
/// at-most-once application: a command whose `seq` is not greater than the
/// highest sequence the store has accepted from the same client is answered
/// from the dedup cache instead of being applied again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub client_id: ClientId,
    pub seq: u64,
    pub op: Operation,
}

impl Command {
    /// Creates a put command.
    pub fn put(client_id: ClientId, seq: u64, key: impl Into<Bytes>, value: impl Into<Bytes>) -> Self {
        Self {
            client_id,
            seq,
            op: Operation::Put {
                key: key.into(),
                value: value.into(),
            },
        }
    }

    /// Creates a delete command.
    pub fn delete(client_id: ClientId, seq: u64, key: impl Into<Bytes>) -> Self {
        Self {
            client_id,
            seq,
            op: Operation::Delete { key: key.into() },
        }
    }

    /// Checks the wire limits and required fields.
    ///
    /// The client id is validated at construction; this covers everything
    /// that can only be judged with the whole command in hand.
    ///
    /// # Errors
    ///
    /// - [`CommandError::ZeroSeq`] — sequence numbers start at 1
    /// - [`CommandError::EmptyKey`] / [`CommandError::KeyTooLong`]
    /// - [`CommandError::ValueTooLong`]
    pub fn validate(&self) -> Result<(), CommandError> {
        if self.seq == 0 {
            return Err(CommandError::ZeroSeq);
        }
        let key = self.op.key();
        if key.is_empty() {
            return Err(CommandError::EmptyKey);
        }
        if key.len() > MAX_KEY_LEN {
            return Err(CommandError::KeyTooLong { len: key.len() });
        }
        if let Operation::Put { value, .. } = &self.op {
            if value.len() as u64 > MAX_VALUE_LEN {
                return Err(CommandError::ValueTooLong { len: value.len() });
            }
        }
        Ok(())
    }
}

// ============================================================================
// Apply results
// ============================================================================

/// Outcome of applying a command to the store.
///
/// `prev_value` carries the previous value on overwrite or delete and is
/// empty otherwise. The bytes are owned copies, never aliases of the store's
/// internal storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyResult {
    pub success: bool,
    pub prev_value: Bytes,
    pub log_index: LogIndex,
}

impl ApplyResult {
    pub fn new(success: bool, prev_value: Bytes, log_index: LogIndex) -> Self {
        Self {
            success,
            prev_value,
            log_index,
        }
    }
}

// ============================================================================
// Validation errors
// ============================================================================

/// A command rejected before it reaches the journal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("client id must not be empty")]
    EmptyClientId,

    #[error("client id too long: {len} bytes, max {MAX_CLIENT_ID_LEN}")]
    ClientIdTooLong { len: usize },

    #[error("sequence numbers start at 1")]
    ZeroSeq,

    #[error("key must not be empty")]
    EmptyKey,

    #[error("key too long: {len} bytes, max {MAX_KEY_LEN}")]
    KeyTooLong { len: usize },

    #[error("value too long: {len} bytes, max {MAX_VALUE_LEN}")]
    ValueTooLong { len: usize },

    #[error("invalid instruction byte {byte:#04x}")]
    InvalidInstruction { byte: u8 },
}
