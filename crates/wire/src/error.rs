//! Error types reported to clients.
//!
//! These errors are:
//! - **Structured**: each variant has typed fields callers can branch on
//! - **Serializable**: they travel inside a `Response`
//! - **Opaque for resource failures**: I/O and allocation problems collapse
//!   to `Internal` so server internals do not leak

use luxdb_core::Label;
use serde::{Deserialize, Serialize};

/// Command execution errors.
///
/// # Categories
///
/// | Category | Variants |
/// |----------|----------|
/// | Not Found | `UnknownIndex`, `UnknownLabel` |
/// | State | `DuplicateIndex`, `NotInitialized`, `AlreadyInitialized` |
/// | Validation | `DimensionMismatch`, `LengthMismatch`, `DuplicateLabel`, `InvalidInput`, `SchemaMismatch` |
/// | Capacity | `CapacityExceeded`, `InvalidCapacity` |
/// | Protocol | `Rejected`, `MalformedCommand` |
/// | System | `Internal` |
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum Error {
    // ==================== Not Found ====================
    /// Index name not present
    #[error("unknown index: {name}")]
    UnknownIndex { name: String },

    /// Labels not present in the index
    #[error("unknown labels: {labels:?}")]
    UnknownLabel { labels: Vec<Label> },

    // ==================== State ====================
    /// Index name already present
    #[error("index already exists: {name}")]
    DuplicateIndex { name: String },

    /// Index has not been initialized
    #[error("index not initialized: {name}")]
    NotInitialized { name: String },

    /// Index was already initialized
    #[error("index already initialized: {name}")]
    AlreadyInitialized { name: String },

    // ==================== Validation ====================
    /// Vector length differs from the index dimension
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Vectors and labels differ in length
    #[error("{vectors} vectors but {labels} labels")]
    LengthMismatch { vectors: usize, labels: usize },

    /// Labels already present (or repeated in the batch)
    #[error("duplicate labels: {labels:?}")]
    DuplicateLabel { labels: Vec<Label> },

    /// Imported file disagrees with the declared schema
    #[error("schema mismatch: {reason}")]
    SchemaMismatch { reason: String },

    /// Argument failed validation
    #[error("invalid input: {reason}")]
    InvalidInput { reason: String },

    // ==================== Capacity ====================
    /// Add would exceed capacity
    #[error("capacity exceeded: capacity {capacity}, required {required}")]
    CapacityExceeded { capacity: usize, required: usize },

    /// Resize below the element count
    #[error("invalid capacity {requested}: index holds {count} elements")]
    InvalidCapacity { requested: usize, count: usize },

    // ==================== Protocol ====================
    /// Frame failed authentication or freshness checks
    #[error("request rejected")]
    Rejected,

    /// Frame authenticated but did not decode to a command
    #[error("malformed command: {reason}")]
    MalformedCommand { reason: String },

    // ==================== System ====================
    /// Server-side failure; details are in the server log
    #[error("internal error: {reason}")]
    Internal { reason: String },
}
