//! Store configuration
//!
//! Usually embedded as the `[store]` table of the server config file.
//!
//! ```toml
//! [store]
//! # Directory of the store; omit for a memory-only store
//! path = "/var/lib/luxdb"
//! # "standard" (default) = background flush every flush_interval_ms
//! # "always"             = flush index data before acknowledging a write
//! durability = "standard"
//! flush_interval_ms = 1000
//! # 0 = one worker per CPU
//! worker_threads = 0
//! max_queue_depth = 1024
//! ```

use std::path::PathBuf;

use luxdb_core::{Error, Result};
use luxdb_durability::DurabilityMode;
use serde::{Deserialize, Serialize};

/// Store configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    /// Store directory; `None` keeps everything in memory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// Durability mode: `"standard"` or `"always"`.
    pub durability: String,
    /// Background flush interval for `"standard"`.
    pub flush_interval_ms: u64,
    /// Worker pool size; 0 means one per available CPU.
    pub worker_threads: usize,
    /// Pool tasks queued or running before callers wait.
    pub max_queue_depth: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            path: None,
            durability: "standard".to_string(),
            flush_interval_ms: DurabilityMode::DEFAULT_INTERVAL_MS,
            worker_threads: 0,
            max_queue_depth: 1024,
        }
    }
}

impl StoreConfig {
    /// Memory-only store with default settings.
    pub fn memory() -> Self {
        Self::default()
    }

    /// Persistent store rooted at `path`.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        StoreConfig {
            path: Some(path.into()),
            ..Self::default()
        }
    }

    /// Set the durability mode name.
    pub fn with_durability(mut self, durability: &str) -> Self {
        self.durability = durability.to_string();
        self
    }

    /// Set the worker pool size.
    pub fn with_worker_threads(mut self, threads: usize) -> Self {
        self.worker_threads = threads;
        self
    }

    /// Parse the durability string into a `DurabilityMode`.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not `"standard"` or `"always"`.
    pub fn durability_mode(&self) -> Result<DurabilityMode> {
        DurabilityMode::parse(&self.durability, self.flush_interval_ms).ok_or_else(|| {
            Error::InvalidInput(format!(
                "invalid durability mode '{}'; expected \"standard\" or \"always\"",
                self.durability
            ))
        })
    }

    /// Worker count with 0 resolved to the available parallelism.
    pub fn resolved_worker_threads(&self) -> usize {
        if self.worker_threads > 0 {
            return self.worker_threads;
        }
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4)
    }
}
