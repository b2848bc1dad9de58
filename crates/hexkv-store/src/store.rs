//! The key/value state machine.

use std::collections::HashMap;
use std::sync::Mutex;

use bytes::Bytes;
use hexkv_types::{ApplyResult, ClientId, Command, LogIndex, Operation};

use crate::dedup::DedupTable;
use crate::StoreError;

/// A node's authoritative in-memory state.
///
/// All mutation goes through [`Store::apply`] with a caller-assigned log
/// index; reads go through [`Store::get`]. Both take the internal lock, so
/// the store is safe to share between the write path and any number of
/// readers.
///
/// # Ownership
///
/// Keys and values are copied in on apply and copied out on read. Nothing
/// handed to a caller aliases the map's own storage.
pub struct Store {
    inner: Mutex<StoreInner>,
}

struct StoreInner {
    kv: HashMap<Vec<u8>, Vec<u8>>,
    last_applied: LogIndex,
    dedup: DedupTable,
}

impl Store {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(StoreInner {
                kv: HashMap::new(),
                last_applied: LogIndex::ZERO,
                dedup: DedupTable::new(),
            }),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, StoreInner>, StoreError> {
        self.inner.lock().map_err(|_| StoreError::LockPoisoned)
    }

    /// Applies a command at the given log index.
    ///
    /// Preconditions: `log_index` must be exactly `last_applied + 1`.
    /// Duplicates (sequence at or below the client's newest) return the
    /// cached result without mutating anything — the idempotent replay path.
    ///
    /// A delete of a missing key is a *successful* apply with
    /// `success = false`: it consumes the log index and is recorded in the
    /// dedup table so a retried delete gets the same "nothing happened"
    /// answer, keeping the journal and the map in lockstep.
    ///
    /// # Errors
    ///
    /// [`StoreError::OutOfOrderApply`] on an index gap or reorder.
    pub fn apply(&self, cmd: &Command, log_index: LogIndex) -> Result<ApplyResult, StoreError> {
        let mut inner = self.lock()?;

        let expected = inner.last_applied.next();
        if log_index != expected {
            return Err(StoreError::OutOfOrderApply {
                expected,
                got: log_index,
            });
        }

        if let Some(cached) = inner.dedup.check(&cmd.client_id, cmd.seq) {
            return Ok(cached.clone());
        }

        let result = match &cmd.op {
            Operation::Put { key, value } => {
                let prev = inner.kv.insert(key.to_vec(), value.to_vec());
                ApplyResult::new(true, prev.map(Bytes::from).unwrap_or_default(), log_index)
            }
            Operation::Delete { key } => match inner.kv.remove(key.as_ref() as &[u8]) {
                Some(prev) => ApplyResult::new(true, Bytes::from(prev), log_index),
                None => ApplyResult::new(false, Bytes::new(), log_index),
            },
        };

        inner.last_applied = log_index;
        inner
            .dedup
            .record(cmd.client_id.clone(), cmd.seq, result.clone());

        Ok(result)
    }

    /// Looks up a key, returning a freshly allocated copy of the value.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] for an absent key.
    pub fn get(&self, key: &[u8]) -> Result<Bytes, StoreError> {
        let inner = self.lock()?;
        inner
            .kv
            .get(key)
            .map(|v| Bytes::copy_from_slice(v))
            .ok_or(StoreError::NotFound)
    }

    /// Checks the dedup table without applying anything.
    ///
    /// The write path uses this to answer duplicates before they ever reach
    /// the journal. Takes and releases the store lock; the caller must not
    /// be holding it.
    pub fn dedup_peek(
        &self,
        client: &ClientId,
        seq: u64,
    ) -> Result<Option<ApplyResult>, StoreError> {
        let inner = self.lock()?;
        Ok(inner.dedup.check(client, seq).cloned())
    }

    /// The highest log index applied so far; `ZERO` when empty.
    pub fn last_applied(&self) -> Result<LogIndex, StoreError> {
        Ok(self.lock()?.last_applied)
    }

    /// Number of live keys.
    pub fn len(&self) -> Result<usize, StoreError> {
        Ok(self.lock()?.kv.len())
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.lock()?.kv.is_empty())
    }

    /// Number of distinct clients in the dedup table.
    pub fn client_count(&self) -> Result<usize, StoreError> {
        Ok(self.lock()?.dedup.len())
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}
