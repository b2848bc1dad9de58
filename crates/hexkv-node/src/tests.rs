//! Unit tests for hexkv-node.
//!
//! These exercise the full open → exec → close → reopen lifecycle against
//! real files, including crash-shaped journals.

use std::fs;
use std::io::Write;
use std::sync::Arc;
use std::thread;

use bytes::Bytes;
use hexkv_store::StoreError;
use hexkv_types::{ClientId, Command, LogIndex};
use hexkv_wal::Wal;
use tempfile::TempDir;

use crate::{Node, NodeError};

fn client(id: &str) -> ClientId {
    ClientId::new(id).unwrap()
}

fn put(id: &str, seq: u64, key: &str, value: &str) -> Command {
    Command::put(client(id), seq, key.as_bytes().to_vec(), value.as_bytes().to_vec())
}

fn delete(id: &str, seq: u64, key: &str) -> Command {
    Command::delete(client(id), seq, key.as_bytes().to_vec())
}

fn wal_size(dir: &TempDir) -> u64 {
    fs::metadata(dir.path().join("wal")).unwrap().len()
}

// ============================================================================
// Lifecycle
// ============================================================================

#[test]
fn open_creates_missing_data_dir() {
    let dir = TempDir::new().unwrap();
    let data_dir = dir.path().join("node-data");
    assert!(!data_dir.exists());

    let node = Node::open(&data_dir).unwrap();
    assert!(data_dir.is_dir());
    assert_eq!(node.last_index().unwrap(), LogIndex::ZERO);
    node.close().unwrap();
}

#[test]
fn open_rejects_file_at_data_path() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("not-a-dir");
    fs::write(&path, b"file").unwrap();

    assert!(matches!(
        Node::open(&path),
        Err(NodeError::NotADirectory { .. })
    ));
}

#[test]
fn close_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let node = Node::open(dir.path()).unwrap();
    node.close().unwrap();
    node.close().unwrap();
}

// ============================================================================
// Write Path Scenarios
// ============================================================================

#[test]
fn fresh_put_then_reopen_preserves_value() {
    let dir = TempDir::new().unwrap();

    let node = Node::open(dir.path()).unwrap();
    let outcome = node.exec(put("a", 1, "k", "v")).unwrap();

    let result = outcome.result();
    assert!(result.success);
    assert!(result.prev_value.is_empty());
    assert_eq!(result.log_index, LogIndex::new(1));
    assert!(!outcome.is_duplicate());
    assert!(wal_size(&dir) > 9);
    node.close().unwrap();

    let node = Node::open(dir.path()).unwrap();
    assert_eq!(node.get(b"k").unwrap(), Bytes::from_static(b"v"));
    assert_eq!(node.last_index().unwrap(), LogIndex::new(1));
    node.close().unwrap();
}

#[test]
fn duplicate_command_does_not_touch_the_journal() {
    let dir = TempDir::new().unwrap();
    let node = Node::open(dir.path()).unwrap();

    let first = node.exec(put("a", 1, "k", "v")).unwrap().into_result();
    let size_after_first = wal_size(&dir);

    let retry = node.exec(put("a", 1, "k", "v")).unwrap();
    assert!(retry.is_duplicate());
    assert_eq!(retry.result(), &first);
    assert_eq!(wal_size(&dir), size_after_first);
    assert_eq!(node.last_index().unwrap(), LogIndex::new(1));
    node.close().unwrap();
}

#[test]
fn overwrite_returns_previous_value() {
    let dir = TempDir::new().unwrap();
    let node = Node::open(dir.path()).unwrap();

    node.exec(put("a", 1, "k", "v")).unwrap();
    let result = node.exec(put("a", 2, "k", "w")).unwrap().into_result();

    assert!(result.success);
    assert_eq!(result.prev_value, Bytes::from_static(b"v"));
    assert_eq!(result.log_index, LogIndex::new(2));
    assert_eq!(node.get(b"k").unwrap(), Bytes::from_static(b"w"));
    node.close().unwrap();
}

#[test]
fn delete_then_reopen_stays_deleted() {
    let dir = TempDir::new().unwrap();
    let node = Node::open(dir.path()).unwrap();

    node.exec(put("a", 1, "k", "v")).unwrap();
    node.exec(put("a", 2, "k", "w")).unwrap();
    let result = node.exec(delete("a", 3, "k")).unwrap().into_result();

    assert!(result.success);
    assert_eq!(result.prev_value, Bytes::from_static(b"w"));
    assert_eq!(result.log_index, LogIndex::new(3));
    assert!(matches!(
        node.get(b"k"),
        Err(NodeError::Store(StoreError::NotFound))
    ));
    node.close().unwrap();

    let node = Node::open(dir.path()).unwrap();
    assert!(matches!(
        node.get(b"k"),
        Err(NodeError::Store(StoreError::NotFound))
    ));
    assert_eq!(node.last_index().unwrap(), LogIndex::new(3));
    node.close().unwrap();
}

#[test]
fn delete_of_missing_key_is_journaled_and_replayable() {
    let dir = TempDir::new().unwrap();
    let node = Node::open(dir.path()).unwrap();

    let result = node.exec(delete("a", 1, "ghost")).unwrap().into_result();
    assert!(!result.success);
    assert_eq!(result.log_index, LogIndex::new(1));
    node.close().unwrap();

    // The no-op delete consumed a log slot and must replay cleanly.
    let node = Node::open(dir.path()).unwrap();
    assert_eq!(node.last_index().unwrap(), LogIndex::new(1));
    node.close().unwrap();
}

#[test]
fn invalid_command_is_rejected_before_the_journal() {
    let dir = TempDir::new().unwrap();
    let node = Node::open(dir.path()).unwrap();
    let size_before = wal_size(&dir);

    let err = node.exec(put("a", 0, "k", "v")).unwrap_err();
    assert!(matches!(err, NodeError::InvalidCommand(_)));
    assert!(err.is_client_error());
    assert_eq!(wal_size(&dir), size_before);
    assert_eq!(node.last_index().unwrap(), LogIndex::ZERO);
    node.close().unwrap();
}

// ============================================================================
// Crash Recovery
// ============================================================================

#[test]
fn junk_tail_is_repaired_on_reopen() {
    let dir = TempDir::new().unwrap();

    let node = Node::open(dir.path()).unwrap();
    node.exec(put("a", 1, "k", "v")).unwrap();
    let good_size = wal_size(&dir);
    node.close().unwrap();

    let mut file = fs::OpenOptions::new()
        .append(true)
        .open(dir.path().join("wal"))
        .unwrap();
    file.write_all(&[0x5A; 7]).unwrap();
    drop(file);

    let node = Node::open(dir.path()).unwrap();
    assert_eq!(node.last_index().unwrap(), LogIndex::new(1));
    assert_eq!(node.get(b"k").unwrap(), Bytes::from_static(b"v"));
    assert_eq!(wal_size(&dir), good_size);
    node.close().unwrap();
}

#[test]
fn state_survives_close_and_reopen_exactly() {
    let dir = TempDir::new().unwrap();

    let node = Node::open(dir.path()).unwrap();
    node.exec(put("a", 1, "x", "1")).unwrap();
    node.exec(put("b", 1, "y", "2")).unwrap();
    node.exec(put("a", 2, "x", "3")).unwrap();
    node.exec(delete("b", 2, "y")).unwrap();
    node.exec(put("c", 1, "z", "4")).unwrap();
    let last = node.last_index().unwrap();
    node.close().unwrap();

    let node = Node::open(dir.path()).unwrap();
    assert_eq!(node.last_index().unwrap(), last);
    assert_eq!(node.get(b"x").unwrap(), Bytes::from_static(b"3"));
    assert_eq!(node.get(b"z").unwrap(), Bytes::from_static(b"4"));
    assert!(matches!(
        node.get(b"y"),
        Err(NodeError::Store(StoreError::NotFound))
    ));
    node.close().unwrap();
}

#[test]
fn replay_rebuilds_the_dedup_table() {
    let dir = TempDir::new().unwrap();

    let node = Node::open(dir.path()).unwrap();
    let original = node.exec(put("a", 1, "k", "v")).unwrap().into_result();
    node.close().unwrap();

    // A retry of a pre-crash command is still answered from the cache.
    let node = Node::open(dir.path()).unwrap();
    let size_before = wal_size(&dir);
    let retry = node.exec(put("a", 1, "k", "v")).unwrap();

    assert!(retry.is_duplicate());
    assert_eq!(retry.result(), &original);
    assert_eq!(wal_size(&dir), size_before);
    node.close().unwrap();
}

#[test]
fn on_disk_indexes_are_gap_free() {
    let dir = TempDir::new().unwrap();

    let node = Node::open(dir.path()).unwrap();
    for seq in 1..=10u64 {
        node.exec(put("a", seq, &format!("k{seq}"), "v")).unwrap();
    }
    node.close().unwrap();

    let mut wal = Wal::open(dir.path().join("wal")).unwrap();
    let (records, last_index) = wal.replay_all().unwrap();
    wal.close().unwrap();

    assert_eq!(last_index, LogIndex::new(10));
    let indexes: Vec<u64> = records.iter().map(|r| r.log_index.as_u64()).collect();
    assert_eq!(indexes, (1..=10).collect::<Vec<u64>>());
}

// ============================================================================
// Concurrency
// ============================================================================

#[test]
fn concurrent_writers_keep_indexes_gap_free() {
    const WRITERS: usize = 4;
    const PER_WRITER: u64 = 25;

    let dir = TempDir::new().unwrap();
    let node = Arc::new(Node::open(dir.path()).unwrap());

    let handles: Vec<_> = (0..WRITERS)
        .map(|w| {
            let node = Arc::clone(&node);
            thread::spawn(move || {
                let id = format!("writer-{w}");
                for seq in 1..=PER_WRITER {
                    let key = format!("{id}-{seq}");
                    let value = format!("v{seq}");
                    let outcome = node.exec(put(&id, seq, &key, &value)).unwrap();
                    assert!(!outcome.is_duplicate());
                    // Read-your-write: the value is visible immediately.
                    assert_eq!(node.get(key.as_bytes()).unwrap(), value.as_bytes());
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let total = WRITERS as u64 * PER_WRITER;
    assert_eq!(node.last_index().unwrap(), LogIndex::new(total));
    node.close().unwrap();

    let mut wal = Wal::open(dir.path().join("wal")).unwrap();
    let (records, _) = wal.replay_all().unwrap();
    wal.close().unwrap();

    let indexes: Vec<u64> = records.iter().map(|r| r.log_index.as_u64()).collect();
    assert_eq!(indexes, (1..=total).collect::<Vec<u64>>());
}

#[test]
fn reads_run_while_a_writer_holds_the_node_lock() {
    let dir = TempDir::new().unwrap();
    let node = Arc::new(Node::open(dir.path()).unwrap());
    node.exec(put("seed", 1, "k", "v")).unwrap();

    let writer = {
        let node = Arc::clone(&node);
        thread::spawn(move || {
            for seq in 1..=50u64 {
                node.exec(put("w", seq, "hot", "x")).unwrap();
            }
        })
    };
    let reader = {
        let node = Arc::clone(&node);
        thread::spawn(move || {
            for _ in 0..200 {
                assert_eq!(node.get(b"k").unwrap(), Bytes::from_static(b"v"));
            }
        })
    };

    writer.join().unwrap();
    reader.join().unwrap();
    node.close().unwrap();
}
