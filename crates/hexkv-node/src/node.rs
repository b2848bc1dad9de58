//! The node: open, exec, get, close.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use bytes::Bytes;
use hexkv_store::Store;
use hexkv_types::{ApplyResult, Command, LogIndex};
use hexkv_wal::{Record, Wal};
use tracing::{error, info};

use crate::NodeError;

/// Journal filename inside the data directory.
const WAL_FILENAME: &str = "wal";

/// Outcome of executing a command.
///
/// Both variants carry the [`ApplyResult`] the client sees; the distinction
/// exists so the transport can count dedup hits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecOutcome {
    /// The command was journaled and applied.
    Applied(ApplyResult),

    /// The command was a retry; the cached result was returned and the
    /// journal was not touched.
    Duplicate(ApplyResult),
}

impl ExecOutcome {
    /// The result to return to the client, either way.
    pub fn result(&self) -> &ApplyResult {
        match self {
            ExecOutcome::Applied(r) | ExecOutcome::Duplicate(r) => r,
        }
    }

    pub fn into_result(self) -> ApplyResult {
        match self {
            ExecOutcome::Applied(r) | ExecOutcome::Duplicate(r) => r,
        }
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, ExecOutcome::Duplicate(_))
    }
}

/// A storage node: one journal, one store, one write path.
///
/// # Locking
///
/// The node lock serializes `exec` end to end, which keeps log appends
/// totally ordered and index assignment gap-free. The store has its own
/// lock, taken briefly inside `exec` (dedup peek, apply) and by `get`; it is
/// never held across the fsync in `Wal::append`. When both are held, the
/// node lock is acquired first.
pub struct Node {
    inner: Mutex<NodeInner>,
    store: Store,
    data_dir: PathBuf,
}

struct NodeInner {
    wal: Wal,
    last_index: LogIndex,
}

impl Node {
    /// Opens (or initializes) a node over the given data directory.
    ///
    /// Replays the journal and rebuilds the store by applying every
    /// recovered record in order, which also repopulates the dedup table.
    /// On any failure after the journal is open, the journal is closed
    /// before returning.
    ///
    /// # Errors
    ///
    /// - [`NodeError::NotADirectory`] if the path exists but is a file
    /// - [`NodeError::Wal`] for journal open/replay failures
    /// - [`NodeError::Store`] if a recovered record does not apply — a
    ///   corrupted-beyond-repair journal, fatal at startup
    pub fn open(data_dir: impl AsRef<Path>) -> Result<Self, NodeError> {
        let data_dir = data_dir.as_ref();
        ensure_data_dir(data_dir)?;

        let mut wal = Wal::open(data_dir.join(WAL_FILENAME))?;

        match rebuild_store(&mut wal) {
            Ok((store, last_index)) => {
                info!(
                    data_dir = %data_dir.display(),
                    last_index = %last_index,
                    keys = store.len().unwrap_or(0),
                    "node open"
                );
                Ok(Self {
                    inner: Mutex::new(NodeInner { wal, last_index }),
                    store,
                    data_dir: data_dir.to_path_buf(),
                })
            }
            Err(err) => {
                error!(%err, "replay failed, closing journal");
                let _ = wal.close();
                Err(err)
            }
        }
    }

    /// Executes a write command. The only write path.
    ///
    /// Holds the node lock for the duration. Duplicates are answered from
    /// the dedup cache *before* the journal append, so a retried command
    /// never inflates the log. A fresh command is journaled (fsynced), then
    /// applied; if apply fails after a successful append the node's journal
    /// and store have diverged and the error is surfaced as-is — the node
    /// should be treated as unhealthy.
    ///
    /// # Errors
    ///
    /// - [`NodeError::InvalidCommand`] — rejected before the journal
    /// - [`NodeError::Wal`] — append failure; node state is unchanged
    /// - [`NodeError::Store`] — apply failure after append (see above)
    pub fn exec(&self, cmd: Command) -> Result<ExecOutcome, NodeError> {
        let mut inner = self.lock_inner()?;

        // Peek takes the store lock and releases it; the append below runs
        // with only the node lock held so readers stay unblocked.
        if let Some(cached) = self.store.dedup_peek(&cmd.client_id, cmd.seq)? {
            return Ok(ExecOutcome::Duplicate(cached));
        }

        cmd.validate()?;

        let next_index = inner.last_index.next();
        inner.wal.append(&Record::new(next_index, cmd.clone()))?;

        let result = self.store.apply(&cmd, next_index)?;

        inner.last_index = next_index;
        Ok(ExecOutcome::Applied(result))
    }

    /// Point read. Never touches the journal or the node lock.
    ///
    /// # Errors
    ///
    /// [`NodeError::Store`] with `NotFound` for an absent key.
    pub fn get(&self, key: &[u8]) -> Result<Bytes, NodeError> {
        Ok(self.store.get(key)?)
    }

    /// The highest log index applied.
    ///
    /// Reads the store's counter rather than the node's copy so health
    /// checks stay responsive while an fsync holds the node lock.
    pub fn last_index(&self) -> Result<LogIndex, NodeError> {
        Ok(self.store.last_applied()?)
    }

    /// The node's data directory.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Flushes and closes the journal. Idempotent.
    ///
    /// # Errors
    ///
    /// [`NodeError::Wal`] if the final flush or fsync fails.
    pub fn close(&self) -> Result<(), NodeError> {
        let mut inner = self.lock_inner()?;
        inner.wal.close()?;
        Ok(())
    }

    fn lock_inner(&self) -> Result<MutexGuard<'_, NodeInner>, NodeError> {
        self.inner.lock().map_err(|_| NodeError::LockPoisoned)
    }
}

/// Creates the data directory if missing; rejects a non-directory.
fn ensure_data_dir(path: &Path) -> Result<(), NodeError> {
    match fs::metadata(path) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(NodeError::NotADirectory {
            path: path.to_path_buf(),
        }),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            #[cfg(unix)]
            {
                use std::os::unix::fs::DirBuilderExt;
                fs::DirBuilder::new()
                    .recursive(true)
                    .mode(0o755)
                    .create(path)?;
            }
            #[cfg(not(unix))]
            fs::create_dir_all(path)?;
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}

/// Replays the journal and applies every record to a fresh store.
fn rebuild_store(wal: &mut Wal) -> Result<(Store, LogIndex), NodeError> {
    let (records, last_index) = wal.replay_all()?;
    let store = Store::new();
    for record in records {
        store.apply(&record.cmd, record.log_index)?;
    }
    Ok((store, last_index))
}
