//! Durability layer for LuxDB
//!
//! This crate handles everything that touches disk:
//!
//! - Store directory layout and the single-process lock
//! - CRC-framed records for the append-only catalog log
//! - The catalog: committed index metadata, replayed on open and
//!   checkpointed on close
//! - Index data files holding each engine's serialized state
//! - Durability modes (Always, Standard)
//!
//! Metadata and bulk vector data are persisted separately. A catalog commit
//! is durable when it returns; data files trail it and are replaced
//! atomically when flushed.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod atomic;
pub mod catalog;
pub mod data_file;
pub mod mode;
pub mod paths;
pub mod record;

pub use catalog::{Catalog, CatalogRecord, CatalogStore};
pub use data_file::{
    read_index_file, read_index_header, write_index_file, DataFileError, DataFileHeader,
    DATA_FILE_MAGIC,
};
pub use mode::DurabilityMode;
pub use paths::{StoreLock, StorePaths};
pub use record::{decode_records, encode_record, RecordError, RECORD_FORMAT_VERSION};
