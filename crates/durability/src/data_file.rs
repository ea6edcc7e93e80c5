//! Index data files.
//!
//! One file per initialized index, holding the serialized engine state.
//!
//! # Layout
//!
//! ```text
//! ┌──────────────┬──────────────┬────────────┬────────────────┬────────────────┐
//! │ Magic "LUXI" │ Format (u32) │ Metric (u8)│ Dimension (u32)│ Capacity (u64) │
//! ├──────────────┼──────────────┴────────────┴────────────────┴────────────────┤
//! │ Count (u64)  │ Payload length (u64) │ Payload (engine bytes) │ CRC32 (u32) │
//! └──────────────┴──────────────────────┴────────────────────────┴─────────────┘
//! ```
//!
//! Integers are little-endian; the CRC covers every preceding byte. Files
//! are replaced atomically, so a reader sees a complete old or new file.

use std::fs::File;
use std::io::{Cursor, Read};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use luxdb_core::{Error, Metric};
use thiserror::Error;

use crate::atomic::write_atomic;

/// Magic bytes identifying an index data file: "LUXI"
pub const DATA_FILE_MAGIC: [u8; 4] = *b"LUXI";

/// Current data file format version
pub const DATA_FILE_FORMAT_VERSION: u32 = 1;

/// Size of the fixed header in bytes
pub const DATA_FILE_HEADER_SIZE: usize = 4 + 4 + 1 + 4 + 8 + 8 + 8;

/// Data file header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataFileHeader {
    /// Distance function of the index
    pub metric: Metric,
    /// Vector dimension
    pub dimension: usize,
    /// Capacity at the time of writing
    pub capacity: usize,
    /// Element count at the time of writing
    pub count: usize,
    /// Length of the engine payload in bytes
    pub payload_len: u64,
}

/// Data file read failures.
#[derive(Debug, Error)]
pub enum DataFileError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Not a data file
    #[error("bad magic bytes")]
    BadMagic,

    /// Written by an unknown format version
    #[error("unsupported format version {0}")]
    UnsupportedVersion(u32),

    /// Unknown metric tag
    #[error("unknown metric tag {0}")]
    UnknownMetric(u8),

    /// File shorter than its header claims
    #[error("file truncated: expected {expected} bytes, found {actual}")]
    Truncated {
        /// Expected size
        expected: u64,
        /// Actual size
        actual: u64,
    },

    /// Header claims a payload no file could hold
    #[error("invalid payload length {0}")]
    InvalidPayloadLength(u64),

    /// Checksum mismatch
    #[error("checksum mismatch: expected {expected:#010x}, computed {computed:#010x}")]
    ChecksumMismatch {
        /// CRC stored in the file
        expected: u32,
        /// CRC computed over the file
        computed: u32,
    },
}

impl From<DataFileError> for Error {
    fn from(e: DataFileError) -> Self {
        match e {
            DataFileError::Io(io) => Error::Io(io),
            other => Error::Corruption(other.to_string()),
        }
    }
}

impl DataFileHeader {
    fn to_bytes(self) -> Vec<u8> {
        let mut out = Vec::with_capacity(DATA_FILE_HEADER_SIZE);
        out.extend_from_slice(&DATA_FILE_MAGIC);
        // Writes into a Vec cannot fail.
        let _ = out.write_u32::<LittleEndian>(DATA_FILE_FORMAT_VERSION);
        out.push(self.metric.to_byte());
        let _ = out.write_u32::<LittleEndian>(self.dimension as u32);
        let _ = out.write_u64::<LittleEndian>(self.capacity as u64);
        let _ = out.write_u64::<LittleEndian>(self.count as u64);
        let _ = out.write_u64::<LittleEndian>(self.payload_len);
        out
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, DataFileError> {
        if bytes.len() < DATA_FILE_HEADER_SIZE {
            return Err(DataFileError::Truncated {
                expected: DATA_FILE_HEADER_SIZE as u64,
                actual: bytes.len() as u64,
            });
        }
        if bytes[0..4] != DATA_FILE_MAGIC {
            return Err(DataFileError::BadMagic);
        }
        let mut cursor = Cursor::new(&bytes[4..DATA_FILE_HEADER_SIZE]);
        let version = cursor.read_u32::<LittleEndian>()?;
        if version != DATA_FILE_FORMAT_VERSION {
            return Err(DataFileError::UnsupportedVersion(version));
        }
        let tag = cursor.read_u8()?;
        let metric = Metric::from_byte(tag).ok_or(DataFileError::UnknownMetric(tag))?;
        let dimension = cursor.read_u32::<LittleEndian>()? as usize;
        let capacity = cursor.read_u64::<LittleEndian>()? as usize;
        let count = cursor.read_u64::<LittleEndian>()? as usize;
        let payload_len = cursor.read_u64::<LittleEndian>()?;
        Ok(DataFileHeader {
            metric,
            dimension,
            capacity,
            count,
            payload_len,
        })
    }
}

/// Atomically write an index data file.
pub fn write_index_file(
    path: &Path,
    metric: Metric,
    dimension: usize,
    capacity: usize,
    count: usize,
    payload: &[u8],
) -> std::io::Result<()> {
    let header = DataFileHeader {
        metric,
        dimension,
        capacity,
        count,
        payload_len: payload.len() as u64,
    };
    let mut bytes = header.to_bytes();
    bytes.reserve(payload.len() + 4);
    bytes.extend_from_slice(payload);
    let crc = crc32fast::hash(&bytes);
    bytes.extend_from_slice(&crc.to_le_bytes());
    write_atomic(path, &bytes)
}

/// Read only the header of a data file.
///
/// Used to validate a file's schema before loading it.
pub fn read_index_header(path: &Path) -> Result<DataFileHeader, DataFileError> {
    let mut buf = [0u8; DATA_FILE_HEADER_SIZE];
    let mut file = File::open(path)?;
    let mut filled = 0;
    while filled < buf.len() {
        let n = file.read(&mut buf[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    DataFileHeader::from_bytes(&buf[..filled])
}

/// Read and verify a whole data file, returning its header and payload.
pub fn read_index_file(path: &Path) -> Result<(DataFileHeader, Vec<u8>), DataFileError> {
    let bytes = std::fs::read(path)?;
    let header = DataFileHeader::from_bytes(&bytes)?;

    let expected = header
        .payload_len
        .checked_add(DATA_FILE_HEADER_SIZE as u64 + 4)
        .ok_or(DataFileError::InvalidPayloadLength(header.payload_len))?;
    if bytes.len() as u64 != expected {
        return Err(DataFileError::Truncated {
            expected,
            actual: bytes.len() as u64,
        });
    }

    let (data, crc_bytes) = bytes.split_at(bytes.len() - 4);
    let mut stored = [0u8; 4];
    stored.copy_from_slice(crc_bytes);
    let expected_crc = u32::from_le_bytes(stored);
    let computed = crc32fast::hash(data);
    if expected_crc != computed {
        return Err(DataFileError::ChecksumMismatch {
            expected: expected_crc,
            computed,
        });
    }

    Ok((header, data[DATA_FILE_HEADER_SIZE..].to_vec()))
}
