//! Frame encoding and decoding for journal records.
//!
//! A frame is `[frameLen:u32][crc32:u32][payload]`, all integers big-endian.
//! The CRC covers the payload only; `frameLen` counts the CRC plus the
//! payload so a reader can skip a frame knowing nothing but the prefix.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use hexkv_types::{ClientId, Command, CommandError, LogIndex, Operation};

use crate::WalError;

/// Journal file header: format name plus a byte-order tag.
pub const WAL_HEADER: &[u8; 9] = b"WALv1-BE\x00";

/// Smallest legal `frameLen`: the CRC alone, with an empty payload.
pub const MIN_FRAME_LEN: u32 = 4;

/// Largest legal `frameLen`. Anything bigger is treated as a torn or
/// corrupted length prefix rather than a real frame.
pub const MAX_FRAME_LEN: u32 = 1 << 30;

/// Instruction byte for a put.
const INSTR_PUT: u8 = 1;

/// Instruction byte for a delete.
const INSTR_DELETE: u8 = 2;

/// One journaled entry: a command stamped with its log index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub log_index: LogIndex,
    pub cmd: Command,
}

impl Record {
    pub fn new(log_index: LogIndex, cmd: Command) -> Self {
        Self { log_index, cmd }
    }
}

/// Serializes a record into a complete frame.
///
/// The command is validated first so that nothing outside the wire limits
/// ever reaches the file.
///
/// # Errors
///
/// [`WalError::InvalidCommand`] if the command fails validation.
pub fn encode(record: &Record) -> Result<Bytes, WalError> {
    record.cmd.validate()?;

    let (instruction, key, value) = match &record.cmd.op {
        Operation::Put { key, value } => (INSTR_PUT, key, Some(value)),
        Operation::Delete { key } => (INSTR_DELETE, key, None),
    };

    let client = record.cmd.client_id.as_bytes();
    let value_len = value.map_or(0, |v| v.len());

    let payload_len = 8 + 1 + 1 + client.len() + 8 + 2 + key.len() + 4 + value_len;
    let mut payload = BytesMut::with_capacity(payload_len);
    payload.put_u64(record.log_index.as_u64());
    payload.put_u8(instruction);
    payload.put_u8(client.len() as u8);
    payload.put_slice(client);
    payload.put_u64(record.cmd.seq);
    payload.put_u16(key.len() as u16);
    payload.put_slice(key);
    payload.put_u32(value_len as u32);
    if let Some(value) = value {
        payload.put_slice(value);
    }

    let crc = crc32fast::hash(&payload);

    let mut frame = BytesMut::with_capacity(8 + payload.len());
    frame.put_u32(4 + payload.len() as u32);
    frame.put_u32(crc);
    frame.put_slice(&payload);

    Ok(frame.freeze())
}

/// Deserializes a record from a frame payload (the bytes after the CRC).
///
/// The caller is expected to have verified the CRC already; this only
/// checks structure. A successfully decoded command is re-validated so a
/// frame that passes its CRC but carries impossible field values is still
/// rejected.
///
/// # Errors
///
/// - [`WalError::UnexpectedEof`] if a field runs past the end of the payload
/// - [`WalError::ClientIdNotUtf8`] for undecodable client id bytes
/// - [`WalError::InvalidCommand`] for a bad instruction byte or limit breach
pub fn decode_payload(mut payload: Bytes) -> Result<Record, WalError> {
    need(&payload, 8)?;
    let log_index = LogIndex::new(payload.get_u64());

    need(&payload, 1)?;
    let instruction = payload.get_u8();
    if instruction != INSTR_PUT && instruction != INSTR_DELETE {
        return Err(CommandError::InvalidInstruction { byte: instruction }.into());
    }

    need(&payload, 1)?;
    let client_len = payload.get_u8() as usize;
    need(&payload, client_len)?;
    let client_bytes = payload.copy_to_bytes(client_len);
    let client_str =
        String::from_utf8(client_bytes.to_vec()).map_err(|_| WalError::ClientIdNotUtf8)?;
    let client_id = ClientId::new(client_str)?;

    need(&payload, 8)?;
    let seq = payload.get_u64();

    need(&payload, 2)?;
    let key_len = payload.get_u16() as usize;
    need(&payload, key_len)?;
    let key = payload.copy_to_bytes(key_len);

    need(&payload, 4)?;
    let value_len = payload.get_u32() as usize;
    need(&payload, value_len)?;
    let value = payload.copy_to_bytes(value_len);

    // The value field is present in every frame; a delete carries zero
    // bytes there and ignores whatever it finds.
    let op = match instruction {
        INSTR_PUT => Operation::Put { key, value },
        _ => Operation::Delete { key },
    };

    let cmd = Command {
        client_id,
        seq,
        op,
    };
    cmd.validate()?;

    Ok(Record::new(log_index, cmd))
}

fn need(buf: &impl Buf, n: usize) -> Result<(), WalError> {
    if buf.remaining() < n {
        return Err(WalError::UnexpectedEof);
    }
    Ok(())
}
