//! # hexkv-wal: Append-only command journal
//!
//! This crate implements the durable write-ahead log. Every committed command
//! is appended as one self-delimiting, CRC-protected frame; on startup the
//! whole journal is replayed to rebuild the store, and a torn or corrupted
//! tail (the partially-written last frame of a crash) is truncated away.
//!
//! # File Format
//!
//! The file opens with the 9-byte header `WALv1-BE\0`, followed by frames:
//!
//! ```text
//! [frameLen:u32][crc32:u32][payload]
//!      4B           4B       variable
//!
//! payload = [logIndex:u64][instruction:u8][clientIdLen:u8][clientId]
//!           [seq:u64][keyLen:u16][key][valueLen:u32][value]
//! ```
//!
//! All integers are big-endian. `frameLen` counts the CRC plus the payload
//! (total frame size minus the 4 bytes of `frameLen` itself), and the CRC32
//! covers the payload only.
//!
//! # Durability
//!
//! `Wal::append` writes the frame, flushes the buffered writer, and fsyncs
//! before acknowledging; the tail offset only advances after a successful
//! fsync. A crash can therefore lose at most the frame that was never
//! acknowledged, and replay removes exactly that frame.

mod error;
mod frame;
mod wal;

pub use error::WalError;
pub use frame::{decode_payload, encode, Record, MAX_FRAME_LEN, MIN_FRAME_LEN, WAL_HEADER};
pub use wal::Wal;
