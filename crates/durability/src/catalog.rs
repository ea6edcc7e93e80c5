//! The catalog: durable mapping of index name to metadata.
//!
//! Every metadata change is one [`CatalogRecord`], appended to
//! `CATALOG.log` and fsynced before it is applied in memory. Opening a store
//! loads the last checkpoint (`CATALOG`) and replays the log over it.
//!
//! # Snapshot Layout
//!
//! ```text
//! ┌──────────────┬──────────────┬──────────────────────┬──────────┐
//! │ Magic "LUXC" │ Format (u32) │ Catalog (MessagePack)│ CRC32    │
//! └──────────────┴──────────────┴──────────────────────┴──────────┘
//! ```
//!
//! Log entries carry a sequence number and the snapshot records the last
//! one it includes, so a crash between writing a checkpoint and truncating
//! the log replays nothing twice.

use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};

use luxdb_core::{Error, IndexId, IndexMeta, IndexState, Metric, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::atomic::write_atomic;
use crate::paths::StorePaths;
use crate::record::{decode_records, encode_record};

/// Magic bytes of the catalog snapshot
pub const CATALOG_MAGIC: [u8; 4] = *b"LUXC";

/// Current snapshot format version
pub const CATALOG_FORMAT_VERSION: u32 = 1;

/// One metadata change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CatalogRecord {
    /// New index in state `Created`
    Created {
        name: String,
        id: IndexId,
        metric: Metric,
        dimension: usize,
    },
    /// `Created -> Initialized`
    Initialized { name: String, capacity: usize },
    /// Capacity change of an initialized index
    Resized { name: String, capacity: usize },
    /// Index removed
    Deleted { name: String },
    /// Index registered directly as `Initialized` from an external file
    Imported {
        name: String,
        id: IndexId,
        metric: Metric,
        dimension: usize,
        capacity: usize,
    },
}

impl CatalogRecord {
    /// Name of the index the record changes
    pub fn name(&self) -> &str {
        match self {
            CatalogRecord::Created { name, .. }
            | CatalogRecord::Initialized { name, .. }
            | CatalogRecord::Resized { name, .. }
            | CatalogRecord::Deleted { name }
            | CatalogRecord::Imported { name, .. } => name,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct LogEntry {
    seq: u64,
    record: CatalogRecord,
}

/// Committed metadata of every index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    entries: BTreeMap<String, IndexMeta>,
    next_id: u64,
    seq: u64,
}

impl Catalog {
    /// All entries, ordered by name
    pub fn entries(&self) -> &BTreeMap<String, IndexMeta> {
        &self.entries
    }

    /// Metadata of one index
    pub fn get(&self, name: &str) -> Option<&IndexMeta> {
        self.entries.get(name)
    }

    /// Whether a name is present
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Id the next created or imported index will receive
    pub fn next_id(&self) -> IndexId {
        IndexId(self.next_id)
    }

    /// Sequence number of the last applied record
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Validate a record against the current state without applying it
    pub fn check(&self, record: &CatalogRecord) -> Result<()> {
        match record {
            CatalogRecord::Created { name, .. } | CatalogRecord::Imported { name, .. } => {
                if self.entries.contains_key(name) {
                    return Err(Error::DuplicateIndex(name.clone()));
                }
            }
            CatalogRecord::Initialized { name, .. } => match self.entries.get(name) {
                None => return Err(Error::UnknownIndex(name.clone())),
                Some(meta) if meta.state != IndexState::Created => {
                    return Err(Error::AlreadyInitialized(name.clone()))
                }
                Some(_) => {}
            },
            CatalogRecord::Resized { name, .. } => match self.entries.get(name) {
                None => return Err(Error::UnknownIndex(name.clone())),
                Some(meta) if meta.state != IndexState::Initialized => {
                    return Err(Error::NotInitialized(name.clone()))
                }
                Some(_) => {}
            },
            CatalogRecord::Deleted { name } => {
                if !self.entries.contains_key(name) {
                    return Err(Error::UnknownIndex(name.clone()));
                }
            }
        }
        Ok(())
    }

    /// Validate and apply a record
    pub fn apply(&mut self, record: CatalogRecord) -> Result<()> {
        self.check(&record)?;
        match record {
            CatalogRecord::Created {
                name,
                id,
                metric,
                dimension,
            } => {
                self.next_id = self.next_id.max(id.0 + 1);
                let meta = IndexMeta::created(name.clone(), id, metric, dimension);
                self.entries.insert(name, meta);
            }
            CatalogRecord::Initialized { name, capacity } => {
                if let Some(meta) = self.entries.get_mut(&name) {
                    meta.state = IndexState::Initialized;
                    meta.capacity = capacity;
                }
            }
            CatalogRecord::Resized { name, capacity } => {
                if let Some(meta) = self.entries.get_mut(&name) {
                    meta.capacity = capacity;
                }
            }
            CatalogRecord::Deleted { name } => {
                self.entries.remove(&name);
            }
            CatalogRecord::Imported {
                name,
                id,
                metric,
                dimension,
                capacity,
            } => {
                self.next_id = self.next_id.max(id.0 + 1);
                let mut meta = IndexMeta::created(name.clone(), id, metric, dimension);
                meta.state = IndexState::Initialized;
                meta.capacity = capacity;
                self.entries.insert(name, meta);
            }
        }
        self.seq += 1;
        Ok(())
    }

    fn to_snapshot_bytes(&self) -> Result<Vec<u8>> {
        let payload =
            rmp_serde::to_vec(self).map_err(|e| Error::Serialization(e.to_string()))?;
        let mut bytes = Vec::with_capacity(8 + payload.len() + 4);
        bytes.extend_from_slice(&CATALOG_MAGIC);
        bytes.extend_from_slice(&CATALOG_FORMAT_VERSION.to_le_bytes());
        bytes.extend_from_slice(&payload);
        let crc = crc32fast::hash(&bytes);
        bytes.extend_from_slice(&crc.to_le_bytes());
        Ok(bytes)
    }

    fn from_snapshot_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < 12 || bytes[0..4] != CATALOG_MAGIC {
            return Err(Error::Corruption("catalog snapshot has no valid header".into()));
        }
        let (data, crc_bytes) = bytes.split_at(bytes.len() - 4);
        let mut stored = [0u8; 4];
        stored.copy_from_slice(crc_bytes);
        if u32::from_le_bytes(stored) != crc32fast::hash(data) {
            return Err(Error::Corruption("catalog snapshot checksum mismatch".into()));
        }
        let mut version = [0u8; 4];
        version.copy_from_slice(&data[4..8]);
        let version = u32::from_le_bytes(version);
        if version != CATALOG_FORMAT_VERSION {
            return Err(Error::Corruption(format!(
                "unsupported catalog format {}",
                version
            )));
        }
        rmp_serde::from_slice(&data[8..]).map_err(|e| Error::Corruption(e.to_string()))
    }
}

/// Catalog plus the log that makes it durable.
///
/// A memory-only store has no log; commits are then applied in memory only.
#[derive(Debug)]
pub struct CatalogStore {
    catalog: Catalog,
    log: Option<LogFile>,
}

#[derive(Debug)]
struct LogFile {
    paths: StorePaths,
    file: File,
    len: u64,
}

impl CatalogStore {
    /// Catalog without persistence
    pub fn in_memory() -> Self {
        CatalogStore {
            catalog: Catalog::default(),
            log: None,
        }
    }

    /// Load the checkpoint, replay the log and open it for appending
    ///
    /// A torn final record is cut off: the commit it held never returned,
    /// so it never happened. A damaged record with committed records after
    /// it fails the open with [`Error::Corruption`] and leaves the log
    /// untouched.
    pub fn open(paths: &StorePaths) -> Result<Self> {
        let snapshot_path = paths.catalog();
        let mut catalog = if snapshot_path.exists() {
            Catalog::from_snapshot_bytes(&std::fs::read(&snapshot_path)?)?
        } else {
            Catalog::default()
        };
        let checkpoint_seq = catalog.seq;

        let log_path = paths.catalog_log();
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&log_path)?;
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)?;

        let (payloads, valid_len, tail_error) = decode_records(&bytes);
        if let Some(err) = &tail_error {
            if !err.is_torn_tail(&bytes) {
                return Err(Error::Corruption(format!(
                    "catalog log: {} ({} of {} bytes unreadable)",
                    err,
                    bytes.len() - valid_len,
                    bytes.len()
                )));
            }
        }
        let mut replayed = 0usize;
        for payload in payloads {
            let entry: LogEntry = rmp_serde::from_slice(&payload)
                .map_err(|e| Error::Corruption(format!("catalog log entry: {}", e)))?;
            if entry.seq <= checkpoint_seq {
                continue;
            }
            if entry.seq != catalog.seq + 1 {
                return Err(Error::Corruption(format!(
                    "catalog log gap: expected seq {}, found {}",
                    catalog.seq + 1,
                    entry.seq
                )));
            }
            catalog
                .apply(entry.record)
                .map_err(|e| Error::Corruption(format!("catalog replay: {}", e)))?;
            replayed += 1;
        }

        if let Some(err) = tail_error {
            warn!(
                target: "luxdb::durability",
                error = %err,
                valid_len,
                file_len = bytes.len(),
                "Truncating torn catalog log tail"
            );
            file.set_len(valid_len as u64)?;
            file.sync_all()?;
        }

        info!(
            target: "luxdb::durability",
            indexes = catalog.entries.len(),
            replayed,
            "Catalog recovered"
        );

        Ok(CatalogStore {
            catalog,
            log: Some(LogFile {
                paths: paths.clone(),
                file,
                len: valid_len as u64,
            }),
        })
    }

    /// Committed state
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Whether commits reach disk
    pub fn is_persistent(&self) -> bool {
        self.log.is_some()
    }

    /// Durably commit one record, then apply it
    ///
    /// On error nothing is applied and the log is left as it was.
    pub fn commit(&mut self, record: CatalogRecord) -> Result<()> {
        self.catalog.check(&record)?;

        if let Some(log) = self.log.as_mut() {
            let entry = LogEntry {
                seq: self.catalog.seq + 1,
                record: record.clone(),
            };
            let payload =
                rmp_serde::to_vec(&entry).map_err(|e| Error::Serialization(e.to_string()))?;
            let bytes = encode_record(&payload);
            if let Err(e) = log.append(&bytes) {
                // Drop any partial write so later records stay readable.
                let _ = log.file.set_len(log.len);
                return Err(e.into());
            }
            log.len += bytes.len() as u64;
        }

        debug!(target: "luxdb::durability", index = record.name(), ?record, "Catalog commit");
        self.catalog.apply(record)
    }

    /// Write a snapshot of the catalog and empty the log
    pub fn checkpoint(&mut self) -> Result<()> {
        let Some(log) = self.log.as_mut() else {
            return Ok(());
        };
        let bytes = self.catalog.to_snapshot_bytes()?;
        write_atomic(&log.paths.catalog(), &bytes)?;
        log.file.set_len(0)?;
        log.file.sync_all()?;
        log.len = 0;
        info!(
            target: "luxdb::durability",
            seq = self.catalog.seq,
            indexes = self.catalog.entries.len(),
            "Catalog checkpointed"
        );
        Ok(())
    }
}

impl LogFile {
    fn append(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        use std::io::{Seek, SeekFrom};
        self.file.seek(SeekFrom::Start(self.len))?;
        self.file.write_all(bytes)?;
        self.file.sync_data()
    }
}
