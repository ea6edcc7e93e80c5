//! Error types for LuxDB internals
//!
//! This is the error used by the engine, durability and store layers. The
//! protocol-facing error lives in `luxdb-wire`; the executor converts between
//! the two. We use `thiserror` for `Display` and `Error`.

use std::io;
use thiserror::Error;

use crate::types::Label;

/// Result type alias for LuxDB operations
pub type Result<T> = std::result::Result<T, Error>;

/// Internal error type
#[derive(Debug, Error)]
pub enum Error {
    /// Name is not present in the store
    #[error("unknown index: {0}")]
    UnknownIndex(String),

    /// Name is already present in the store
    #[error("index already exists: {0}")]
    DuplicateIndex(String),

    /// Operation needs an initialized index
    #[error("index not initialized: {0}")]
    NotInitialized(String),

    /// Initialize was called twice
    #[error("index already initialized: {0}")]
    AlreadyInitialized(String),

    /// Vector has the wrong number of components
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimension of the index
        expected: usize,
        /// Dimension of the offending vector
        actual: usize,
    },

    /// Vectors and labels differ in length
    #[error("{vectors} vectors but {labels} labels")]
    LengthMismatch {
        /// Number of vectors supplied
        vectors: usize,
        /// Number of labels supplied
        labels: usize,
    },

    /// Labels already present in the index (or repeated within a batch)
    #[error("duplicate labels: {0:?}")]
    DuplicateLabel(Vec<Label>),

    /// Add would push the element count above capacity
    #[error("capacity exceeded: capacity {capacity}, required {required}")]
    CapacityExceeded {
        /// Current capacity
        capacity: usize,
        /// Element count the add would need
        required: usize,
    },

    /// Resize below the current element count
    #[error("invalid capacity {requested}: index holds {count} elements")]
    InvalidCapacity {
        /// Requested capacity
        requested: usize,
        /// Current element count
        count: usize,
    },

    /// Labels not present in the index
    #[error("unknown labels: {0:?}")]
    UnknownLabel(Vec<Label>),

    /// Imported file does not match the declared metric or dimension
    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    /// Metric name is not one of l2, cosine, ip
    #[error("unknown metric: {0}")]
    UnknownMetric(String),

    /// Argument failed validation
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// I/O error (file operations)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Serialization/deserialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Data corruption detected
    #[error("data corruption: {0}")]
    Corruption(String),

    /// Engine could not satisfy the request (allocation failure)
    #[error("engine error: {0}")]
    Engine(String),

    /// Store is closed or a worker went away
    #[error("internal error: {0}")]
    Internal(String),
}
