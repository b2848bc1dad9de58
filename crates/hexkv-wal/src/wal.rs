//! The journal file: open-or-create, durable append, replay with tail repair.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use bytes::Bytes;
use hexkv_types::LogIndex;
use tracing::{debug, info, warn};

use crate::frame::{self, Record, MAX_FRAME_LEN, MIN_FRAME_LEN, WAL_HEADER};
use crate::WalError;

/// Write buffer size layered over the journal file.
const WRITE_BUF_SIZE: usize = 64 * 1024;

/// The append-only command journal.
///
/// Owns the file descriptor for the process lifetime between `open` and
/// `close`. Appends are not internally synchronized; the node serializes
/// all writers.
///
/// # Invariants
///
/// - Every frame between the header and `tail_offset` passes its length and
///   CRC checks and decodes.
/// - `tail_offset` only advances after a successful fsync.
pub struct Wal {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
    tail_offset: u64,
}

impl Wal {
    /// Opens the journal at `path`, creating file and parent directory if
    /// missing.
    ///
    /// A fresh file gets the header written and fsynced; an existing file
    /// must start with the exact header bytes.
    ///
    /// # Errors
    ///
    /// - [`WalError::BadHeader`] if the file exists with a different header
    /// - [`WalError::Io`] for any filesystem failure
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, WalError> {
        let path = path.into();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&path)?;

        let size = file.metadata()?.len();
        let tail_offset = if size == 0 {
            file.write_all(WAL_HEADER)?;
            file.sync_all()?;
            debug!(path = %path.display(), "created journal");
            WAL_HEADER.len() as u64
        } else {
            let mut header = [0u8; 9];
            file.seek(SeekFrom::Start(0))?;
            file.read_exact(&mut header)?;
            if &header != WAL_HEADER {
                return Err(WalError::BadHeader);
            }
            size
        };

        file.seek(SeekFrom::End(0))?;

        Ok(Self {
            path,
            writer: Some(BufWriter::with_capacity(WRITE_BUF_SIZE, file)),
            tail_offset,
        })
    }

    /// Byte offset where the next frame will be written.
    pub fn tail_offset(&self) -> u64 {
        self.tail_offset
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one record durably.
    ///
    /// Encode, write, flush, fsync; only then is the tail offset advanced.
    /// On any error the offset is untouched, so a failed append never
    /// poisons the bookkeeping.
    ///
    /// # Errors
    ///
    /// - [`WalError::InvalidCommand`] if the record fails validation
    /// - [`WalError::Closed`] after `close`
    /// - [`WalError::Io`] for write or fsync failures
    pub fn append(&mut self, record: &Record) -> Result<(), WalError> {
        let frame = frame::encode(record)?;

        let writer = self.writer.as_mut().ok_or(WalError::Closed)?;
        writer.write_all(&frame)?;
        writer.flush()?;
        writer.get_ref().sync_all()?;

        self.tail_offset += frame.len() as u64;
        debug!(
            log_index = %record.log_index,
            bytes = frame.len(),
            tail_offset = self.tail_offset,
            "appended frame"
        );
        Ok(())
    }

    /// Replays every intact frame from the head of the journal.
    ///
    /// Returns the decoded records in order plus the highest log index seen.
    /// A torn or corrupted tail is truncated back to the last good frame,
    /// fsynced, and the writer repositioned there; all earlier frames are
    /// intact because every acknowledged append was fsynced.
    ///
    /// Startup only: must run before the first `append`.
    ///
    /// # Errors
    ///
    /// [`WalError::Io`] for hard filesystem failures. Corruption is not an
    /// error here — it is repaired.
    pub fn replay_all(&mut self) -> Result<(Vec<Record>, LogIndex), WalError> {
        // Make sure the on-disk bytes match what we are about to scan.
        self.writer.as_mut().ok_or(WalError::Closed)?.flush()?;

        let data: Bytes = fs::read(&self.path)?.into();

        let mut records = Vec::new();
        let mut last_index = LogIndex::ZERO;
        let mut pos = WAL_HEADER.len();
        let mut last_good = pos;
        let mut repair = false;

        loop {
            match read_frame_at(&data, pos) {
                Ok(None) => break,
                Ok(Some((record, consumed))) => {
                    last_index = record.log_index;
                    records.push(record);
                    pos += consumed;
                    last_good = pos;
                }
                Err(err) => {
                    warn!(
                        %err,
                        offset = pos,
                        discarded = data.len() - last_good,
                        "journal tail unreadable, repairing"
                    );
                    repair = true;
                    break;
                }
            }
        }

        if repair {
            let writer = self.writer.as_mut().ok_or(WalError::Closed)?;
            let file = writer.get_mut();
            file.set_len(last_good as u64)?;
            file.sync_all()?;
            file.seek(SeekFrom::Start(last_good as u64))?;
        }

        self.tail_offset = last_good as u64;
        info!(
            records = records.len(),
            last_index = %last_index,
            repaired = repair,
            "journal replay complete"
        );
        Ok((records, last_index))
    }

    /// Flushes, fsyncs, and closes the journal. Idempotent.
    ///
    /// # Errors
    ///
    /// [`WalError::Io`] if the final flush or fsync fails.
    pub fn close(&mut self) -> Result<(), WalError> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
            writer.get_ref().sync_all()?;
        }
        Ok(())
    }
}

/// Reads one frame at `pos` in the in-memory journal image.
///
/// Returns `Ok(None)` exactly at the end of the data (clean EOF),
/// `Ok(Some((record, bytes_consumed)))` for an intact frame, and an error
/// for a torn tail ([`WalError::UnexpectedEof`]) or a corrupted frame
/// (length out of range, CRC mismatch, undecodable payload).
fn read_frame_at(data: &Bytes, pos: usize) -> Result<Option<(Record, usize)>, WalError> {
    let remaining = data.len().saturating_sub(pos);
    if remaining == 0 {
        return Ok(None);
    }
    if remaining < 4 {
        return Err(WalError::UnexpectedEof);
    }

    let frame_len = u32::from_be_bytes(
        data[pos..pos + 4]
            .try_into()
            .expect("slice is exactly 4 bytes after bounds check"),
    );
    if !(MIN_FRAME_LEN..=MAX_FRAME_LEN).contains(&frame_len) {
        return Err(WalError::FrameLenOutOfRange { len: frame_len });
    }

    let frame_len = frame_len as usize;
    if remaining < 4 + frame_len {
        return Err(WalError::UnexpectedEof);
    }

    let stored_crc = u32::from_be_bytes(
        data[pos + 4..pos + 8]
            .try_into()
            .expect("slice is exactly 4 bytes after bounds check"),
    );
    let payload = data.slice(pos + 8..pos + 4 + frame_len);
    if crc32fast::hash(&payload) != stored_crc {
        return Err(WalError::CrcMismatch);
    }

    let record = frame::decode_payload(payload)?;
    Ok(Some((record, 4 + frame_len)))
}
