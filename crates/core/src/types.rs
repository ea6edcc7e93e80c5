//! Index metadata types
//!
//! `IndexMeta` is the unit the store commits durably. `dimension` and
//! `metric` are fixed at creation; `capacity` only moves through an
//! explicit resize.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Caller-assigned identifier of a single vector within an index
pub type Label = u64;

/// Distance function of an index
///
/// Distances are always "smaller is closer":
/// - `L2`: squared Euclidean distance
/// - `Ip`: `1 - dot(a, b)`
/// - `Cosine`: `1 - cos(a, b)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    /// Squared Euclidean distance
    L2,
    /// Cosine distance
    Cosine,
    /// Inner-product distance
    Ip,
}

impl Metric {
    /// Canonical lowercase name
    pub fn name(&self) -> &'static str {
        match self {
            Metric::L2 => "l2",
            Metric::Cosine => "cosine",
            Metric::Ip => "ip",
        }
    }

    /// Tag stored in index data file headers
    pub fn to_byte(&self) -> u8 {
        match self {
            Metric::L2 => 0,
            Metric::Cosine => 1,
            Metric::Ip => 2,
        }
    }

    /// Inverse of [`Metric::to_byte`]
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0 => Some(Metric::L2),
            1 => Some(Metric::Cosine),
            2 => Some(Metric::Ip),
            _ => None,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Metric {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "l2" => Ok(Metric::L2),
            "cosine" => Ok(Metric::Cosine),
            "ip" => Ok(Metric::Ip),
            other => Err(Error::UnknownMetric(other.to_string())),
        }
    }
}

/// Lifecycle state of an index
///
/// `Created -> Initialized -> Deleted`. A deleted name is removed from the
/// store, so `Deleted` is only ever observed on a handle that is being torn
/// down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexState {
    /// Metadata exists, no engine allocated yet
    Created,
    /// Engine allocated, index is usable
    Initialized,
    /// Index has been dropped
    Deleted,
}

impl fmt::Display for IndexState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexState::Created => f.write_str("created"),
            IndexState::Initialized => f.write_str("initialized"),
            IndexState::Deleted => f.write_str("deleted"),
        }
    }
}

/// Store-assigned numeric identity of an index
///
/// Ids are monotonic and never reused, so a re-created name never picks up
/// the data file of a deleted predecessor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct IndexId(pub u64);

impl IndexId {
    /// File name of this index's bulk data, relative to the data directory
    pub fn data_file_name(&self) -> String {
        format!("{:016x}.lux", self.0)
    }

    /// Parse a data file name back into an id
    pub fn from_data_file_name(name: &str) -> Option<Self> {
        let stem = name.strip_suffix(".lux")?;
        if stem.len() != 16 {
            return None;
        }
        u64::from_str_radix(stem, 16).ok().map(IndexId)
    }
}

impl fmt::Display for IndexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Metadata of one named index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexMeta {
    /// Unique name
    pub name: String,
    /// Store-assigned id
    pub id: IndexId,
    /// Distance function
    pub metric: Metric,
    /// Number of components per vector
    pub dimension: usize,
    /// Maximum number of elements; zero until initialized
    pub capacity: usize,
    /// Lifecycle state
    pub state: IndexState,
}

impl IndexMeta {
    /// Metadata of a freshly created index
    pub fn created(name: impl Into<String>, id: IndexId, metric: Metric, dimension: usize) -> Self {
        IndexMeta {
            name: name.into(),
            id,
            metric,
            dimension,
            capacity: 0,
            state: IndexState::Created,
        }
    }

    /// Locator of the bulk data, relative to the data directory
    pub fn data_path(&self) -> String {
        self.id.data_file_name()
    }

    /// True once an engine has been allocated
    pub fn is_initialized(&self) -> bool {
        self.state == IndexState::Initialized
    }
}
