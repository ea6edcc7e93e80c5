//! Core types for LuxDB
//!
//! This crate defines the foundational types shared by every other crate:
//! - Label: caller-assigned identifier of one vector inside an index
//! - Metric: distance function an index is created with
//! - IndexState / IndexMeta / IndexId: per-index metadata
//! - Limits: validation bounds for names and dimensions
//! - Error: internal error type used below the protocol boundary

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod limits;
pub mod types;

pub use error::{Error, Result};
pub use limits::{validate_dimension, validate_index_name, MAX_DIMENSION, MAX_INDEX_NAME_BYTES};
pub use types::{IndexId, IndexMeta, IndexState, Label, Metric};
