//! CRC-framed log records.
//!
//! # Record Layout
//!
//! ```text
//! ┌─────────────────┬──────────────────┬─────────────────────────┬──────────┐
//! │ Length (4 bytes)│ Format Ver (1)   │ Payload (variable)      │ CRC32 (4)│
//! └─────────────────┴──────────────────┴─────────────────────────┴──────────┘
//! ```
//!
//! `Length` counts the format byte, payload and CRC. The CRC covers the
//! length, format byte and payload. All integers are little-endian.

use std::io::Cursor;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use thiserror::Error;

/// Current record format version
pub const RECORD_FORMAT_VERSION: u8 = 1;

const LEN_SIZE: usize = 4;
const CRC_SIZE: usize = 4;
const MIN_BODY: usize = 1 + CRC_SIZE;

/// Why a record could not be read
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    /// Bytes end inside the record
    #[error("truncated record at offset {offset}")]
    Truncated {
        /// Offset of the record start
        offset: usize,
    },

    /// Checksum does not match
    #[error("checksum mismatch at offset {offset}: expected {expected:#010x}, computed {computed:#010x}")]
    ChecksumMismatch {
        /// Offset of the record start
        offset: usize,
        /// CRC stored in the record
        expected: u32,
        /// CRC computed over the record
        computed: u32,
    },

    /// Unknown record format version
    #[error("unsupported record format {version} at offset {offset}")]
    UnsupportedVersion {
        /// Offset of the record start
        offset: usize,
        /// Version byte found
        version: u8,
    },

    /// Length field smaller than the fixed overhead
    #[error("invalid record length {len} at offset {offset}")]
    InvalidLength {
        /// Offset of the record start
        offset: usize,
        /// Length field found
        len: u32,
    },
}

impl RecordError {
    /// Whether this error is a torn final write rather than damage
    /// inside the log.
    ///
    /// Only a record that runs to the end of `bytes` counts as torn; a bad
    /// record with more bytes after it means committed records would be
    /// lost by truncating, so it is corruption.
    pub fn is_torn_tail(&self, bytes: &[u8]) -> bool {
        match *self {
            RecordError::Truncated { .. } => true,
            RecordError::ChecksumMismatch { offset, .. } | RecordError::InvalidLength { offset, .. } => {
                declared_end(bytes, offset).map_or(true, |end| end >= bytes.len())
            }
            RecordError::UnsupportedVersion { .. } => false,
        }
    }
}

fn declared_end(bytes: &[u8], offset: usize) -> Option<usize> {
    let mut cursor = Cursor::new(bytes.get(offset..)?);
    let len = cursor.read_u32::<LittleEndian>().ok()?;
    offset.checked_add(LEN_SIZE)?.checked_add(len as usize)
}

/// Frame one payload as a record.
pub fn encode_record(payload: &[u8]) -> Vec<u8> {
    let body_len = (1 + payload.len() + CRC_SIZE) as u32;
    let mut out = Vec::with_capacity(LEN_SIZE + body_len as usize);
    // Writes into a Vec cannot fail.
    let _ = out.write_u32::<LittleEndian>(body_len);
    out.push(RECORD_FORMAT_VERSION);
    out.extend_from_slice(payload);
    let crc = crc32fast::hash(&out);
    let _ = out.write_u32::<LittleEndian>(crc);
    out
}

/// Decode consecutive records from `bytes`.
///
/// Returns the payloads of every valid record up to the first invalid one,
/// the number of bytes they span, and the error that stopped decoding (if
/// any). Callers truncate to the valid length only when
/// [`RecordError::is_torn_tail`] holds.
pub fn decode_records(bytes: &[u8]) -> (Vec<Vec<u8>>, usize, Option<RecordError>) {
    let mut payloads = Vec::new();
    let mut offset = 0;

    while offset < bytes.len() {
        match decode_one(bytes, offset) {
            Ok((payload, next)) => {
                payloads.push(payload);
                offset = next;
            }
            Err(e) => return (payloads, offset, Some(e)),
        }
    }
    (payloads, offset, None)
}

fn decode_one(bytes: &[u8], offset: usize) -> Result<(Vec<u8>, usize), RecordError> {
    let rest = &bytes[offset..];
    if rest.len() < LEN_SIZE {
        return Err(RecordError::Truncated { offset });
    }
    let mut cursor = Cursor::new(rest);
    let len = cursor
        .read_u32::<LittleEndian>()
        .map_err(|_| RecordError::Truncated { offset })?;
    if (len as usize) < MIN_BODY {
        return Err(RecordError::InvalidLength { offset, len });
    }
    let total = LEN_SIZE + len as usize;
    if rest.len() < total {
        return Err(RecordError::Truncated { offset });
    }

    let crc_start = total - CRC_SIZE;
    let mut crc_bytes = [0u8; CRC_SIZE];
    crc_bytes.copy_from_slice(&rest[crc_start..total]);
    let expected = u32::from_le_bytes(crc_bytes);
    let computed = crc32fast::hash(&rest[..crc_start]);
    if expected != computed {
        return Err(RecordError::ChecksumMismatch {
            offset,
            expected,
            computed,
        });
    }

    let version = rest[LEN_SIZE];
    if version != RECORD_FORMAT_VERSION {
        return Err(RecordError::UnsupportedVersion { offset, version });
    }

    Ok((rest[LEN_SIZE + 1..crc_start].to_vec(), offset + total))
}
