//! Output enum for command results.
//!
//! Every command produces exactly one output variant; the mapping is listed
//! on each [`Command`](crate::Command) variant.

use std::collections::BTreeMap;

use luxdb_core::{IndexMeta, Label};
use serde::{Deserialize, Serialize};

/// Successful command results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Output {
    /// No return value
    Unit,

    /// Handshake echo
    Pong { nonce: u64 },

    /// Boolean result
    Bool(bool),

    /// Element count
    Count(usize),

    /// Labels, ascending
    Labels(Vec<Label>),

    /// Vectors in request order
    Vectors(Vec<Vec<f32>>),

    /// One row per query vector, nearest first
    Neighbors {
        labels: Vec<Vec<Label>>,
        distances: Vec<Vec<f32>>,
    },

    /// Name to metadata, ordered by name
    Indexes(BTreeMap<String, IndexMeta>),

    /// Metadata of one index
    Info(IndexInfo),
}

/// Metadata of one index together with its live element count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexInfo {
    /// Committed metadata
    pub meta: IndexMeta,
    /// Number of elements currently held
    pub count: usize,
}
