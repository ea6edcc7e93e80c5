//! Command enum defining all LuxDB operations.
//!
//! Commands are the instruction set of the server. Each variant carries
//! every parameter needed to execute it; there is no ambient session state
//! beyond authentication.

use std::path::PathBuf;

use luxdb_core::{Label, Metric};
use serde::{Deserialize, Serialize};

/// A self-contained, serializable operation.
///
/// # Command Categories
///
/// | Category | Commands |
/// |----------|----------|
/// | Connection | `Ping` |
/// | Store | `CreateIndex`, `DeleteIndex`, `ListIndexes`, `ImportIndex`, `IndexExists`, `Flush` |
/// | Index lifecycle | `InitIndex`, `ResizeIndex` |
/// | Items | `AddItems`, `DeleteItem`, `GetIds`, `GetElements`, `Count`, `Info` |
/// | Search | `QueryIndex` |
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub enum Command {
    // ==================== Connection ====================
    /// Echo a nonce; used as the handshake after connecting.
    /// Returns: `Output::Pong`
    Ping { nonce: u64 },

    // ==================== Store ====================
    /// Register a new index in state `Created`.
    /// Returns: `Output::Unit`
    CreateIndex {
        name: String,
        metric: Metric,
        dimension: usize,
    },

    /// Remove an index and its data.
    /// Returns: `Output::Unit`
    DeleteIndex { name: String },

    /// Snapshot of every index's metadata.
    /// Returns: `Output::Indexes`
    ListIndexes,

    /// Register an index from an existing data file.
    /// Returns: `Output::Unit`
    ImportIndex {
        name: String,
        source_path: PathBuf,
        metric: Metric,
        dimension: usize,
    },

    /// Whether a name is present.
    /// Returns: `Output::Bool`
    IndexExists { name: String },

    /// Persist every index with unflushed changes.
    /// Returns: `Output::Unit`
    Flush,

    // ==================== Index lifecycle ====================
    /// Allocate the engine of a `Created` index.
    /// Returns: `Output::Unit`
    InitIndex { name: String, capacity: usize },

    /// Change capacity; never below the element count.
    /// Returns: `Output::Unit`
    ResizeIndex { name: String, capacity: usize },

    // ==================== Items ====================
    /// Insert vectors under the given labels.
    /// Returns: `Output::Unit`
    AddItems {
        name: String,
        vectors: Vec<Vec<f32>>,
        labels: Vec<Label>,
    },

    /// Remove one vector.
    /// Returns: `Output::Unit`
    DeleteItem { name: String, label: Label },

    /// All labels in the index, ascending.
    /// Returns: `Output::Labels`
    GetIds { name: String },

    /// Vectors for the given labels, in request order.
    /// Returns: `Output::Vectors`
    GetElements { name: String, labels: Vec<Label> },

    /// Number of elements.
    /// Returns: `Output::Count`
    Count { name: String },

    /// Metadata plus element count.
    /// Returns: `Output::Info`
    Info { name: String },

    // ==================== Search ====================
    /// k nearest neighbours of each query vector.
    /// Returns: `Output::Neighbors`
    QueryIndex {
        name: String,
        vectors: Vec<Vec<f32>>,
        k: usize,
    },
}

impl Command {
    /// Short operation name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Ping { .. } => "ping",
            Command::CreateIndex { .. } => "create_index",
            Command::DeleteIndex { .. } => "delete_index",
            Command::ListIndexes => "list_indexes",
            Command::ImportIndex { .. } => "import_index",
            Command::IndexExists { .. } => "index_exists",
            Command::Flush => "flush",
            Command::InitIndex { .. } => "init_index",
            Command::ResizeIndex { .. } => "resize_index",
            Command::AddItems { .. } => "add_items",
            Command::DeleteItem { .. } => "delete_item",
            Command::GetIds { .. } => "get_ids",
            Command::GetElements { .. } => "get_elements",
            Command::Count { .. } => "count",
            Command::Info { .. } => "info",
            Command::QueryIndex { .. } => "query_index",
        }
    }

    /// Index the command targets, if any.
    pub fn index_name(&self) -> Option<&str> {
        match self {
            Command::Ping { .. } | Command::ListIndexes | Command::Flush => None,
            Command::CreateIndex { name, .. }
            | Command::DeleteIndex { name }
            | Command::ImportIndex { name, .. }
            | Command::IndexExists { name }
            | Command::InitIndex { name, .. }
            | Command::ResizeIndex { name, .. }
            | Command::AddItems { name, .. }
            | Command::DeleteItem { name, .. }
            | Command::GetIds { name }
            | Command::GetElements { name, .. }
            | Command::Count { name }
            | Command::Info { name }
            | Command::QueryIndex { name, .. } => Some(name),
        }
    }
}
