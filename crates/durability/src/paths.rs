//! Store directory structure
//!
//! ```text
//! store/
//! ├── .lock           # Held exclusively by the owning process
//! ├── CATALOG         # Checkpointed metadata snapshot
//! ├── CATALOG.log     # Metadata commits since the last checkpoint
//! └── data/
//!     ├── 0000000000000001.lux
//!     └── ...
//! ```

use std::fs::File;
use std::path::{Path, PathBuf};

use luxdb_core::{Error, IndexId, Result};

/// Store directory paths
#[derive(Debug, Clone)]
pub struct StorePaths {
    root: PathBuf,
}

impl StorePaths {
    /// Create paths from root directory
    pub fn from_root(root: impl AsRef<Path>) -> Self {
        StorePaths {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Root store directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Checkpointed catalog snapshot
    pub fn catalog(&self) -> PathBuf {
        self.root.join("CATALOG")
    }

    /// Append-only catalog log
    pub fn catalog_log(&self) -> PathBuf {
        self.root.join("CATALOG.log")
    }

    /// Directory of index data files
    pub fn data_dir(&self) -> PathBuf {
        self.root.join("data")
    }

    /// Data file of one index
    pub fn data_file(&self, id: IndexId) -> PathBuf {
        self.data_dir().join(id.data_file_name())
    }

    /// Process lock file
    pub fn lock_file(&self) -> PathBuf {
        self.root.join(".lock")
    }

    /// Create the full directory structure
    pub fn create_directories(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.root)?;
        std::fs::create_dir_all(self.data_dir())?;
        Ok(())
    }

    /// Take the exclusive process lock on this store
    pub fn lock(&self) -> Result<StoreLock> {
        let path = self.lock_file();
        let file = std::fs::OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)?;
        fs2::FileExt::try_lock_exclusive(&file).map_err(|_| {
            Error::Internal(format!(
                "store at '{}' is already in use by another process",
                self.root.display()
            ))
        })?;
        Ok(StoreLock { _file: file })
    }
}

/// Exclusive lock on a store directory, released on drop.
#[derive(Debug)]
pub struct StoreLock {
    _file: File,
}
