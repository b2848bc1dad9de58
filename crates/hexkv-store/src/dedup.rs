//! Per-client duplicate detection.
//!
//! Each client stamps its commands with a monotonically increasing sequence
//! number. The table remembers, per client, the highest sequence accepted and
//! the result that was returned for it; a command at or below that sequence
//! is a retry and gets the cached result back verbatim.
//!
//! Entries live for the process lifetime and are rebuilt from the journal on
//! startup (replay re-applies every record, re-recording as it goes).

use std::collections::HashMap;

use hexkv_types::{ApplyResult, ClientId};

/// Cached outcome for the newest command accepted from one client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DedupEntry {
    /// Highest sequence number this client has had applied.
    pub last_seq: u64,

    /// The result returned for that sequence.
    pub last_result: ApplyResult,
}

/// Tracks the newest accepted sequence per client for duplicate detection.
///
/// Not internally synchronized; lives under the store lock.
#[derive(Debug, Default)]
pub struct DedupTable {
    entries: HashMap<ClientId, DedupEntry>,
}

impl DedupTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks whether `seq` from `client` is a duplicate.
    ///
    /// # Returns
    ///
    /// - `Some(result)` if the sequence was already applied — the cached
    ///   result to return without touching state
    /// - `None` if this is a fresh command
    pub fn check(&self, client: &ClientId, seq: u64) -> Option<&ApplyResult> {
        match self.entries.get(client) {
            Some(entry) if seq <= entry.last_seq => Some(&entry.last_result),
            _ => None,
        }
    }

    /// Records the result of a freshly applied command.
    ///
    /// Overwrites the client's previous entry: only the newest sequence and
    /// its result are retained.
    pub fn record(&mut self, client: ClientId, seq: u64, result: ApplyResult) {
        debug_assert!(
            self.entries.get(&client).map_or(true, |e| seq > e.last_seq),
            "recording a sequence that is not newer than the cached one"
        );
        self.entries.insert(
            client,
            DedupEntry {
                last_seq: seq,
                last_result: result,
            },
        );
    }

    /// Highest sequence seen for a client, if any.
    pub fn last_seq(&self, client: &ClientId) -> Option<u64> {
        self.entries.get(client).map(|e| e.last_seq)
    }

    /// Number of clients ever seen.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
