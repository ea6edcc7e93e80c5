//! Error conversion from internal error types.
//!
//! Validation and state errors keep their details. Resource errors (I/O,
//! serialization, corruption, engine failures) are logged here with full
//! context and reach the client only as `Internal`.

use luxdb_core::Error as CoreError;
use tracing::error;

use crate::{Error, Result};

/// Convert an internal error into the protocol error a client sees.
pub fn to_wire_error(err: CoreError) -> Error {
    match err {
        CoreError::UnknownIndex(name) => Error::UnknownIndex { name },
        CoreError::DuplicateIndex(name) => Error::DuplicateIndex { name },
        CoreError::NotInitialized(name) => Error::NotInitialized { name },
        CoreError::AlreadyInitialized(name) => Error::AlreadyInitialized { name },
        CoreError::DimensionMismatch { expected, actual } => {
            Error::DimensionMismatch { expected, actual }
        }
        CoreError::LengthMismatch { vectors, labels } => Error::LengthMismatch { vectors, labels },
        CoreError::DuplicateLabel(labels) => Error::DuplicateLabel { labels },
        CoreError::UnknownLabel(labels) => Error::UnknownLabel { labels },
        CoreError::CapacityExceeded { capacity, required } => {
            Error::CapacityExceeded { capacity, required }
        }
        CoreError::InvalidCapacity { requested, count } => {
            Error::InvalidCapacity { requested, count }
        }
        CoreError::SchemaMismatch(reason) => Error::SchemaMismatch { reason },
        CoreError::UnknownMetric(metric) => Error::InvalidInput {
            reason: format!("unknown metric '{}'", metric),
        },
        CoreError::InvalidInput(reason) => Error::InvalidInput { reason },

        // Resource failures
        err @ (CoreError::Io(_)
        | CoreError::Serialization(_)
        | CoreError::Corruption(_)
        | CoreError::Engine(_)) => {
            error!(target: "luxdb::executor", error = %err, "Resource failure");
            Error::Internal {
                reason: "resource failure; see server log".to_string(),
            }
        }
        CoreError::Internal(reason) => {
            error!(target: "luxdb::executor", %reason, "Internal failure");
            Error::Internal { reason }
        }
    }
}

/// Convert an internal result, mapping the error with [`to_wire_error`].
pub fn convert_result<T>(r: luxdb_core::Result<T>) -> Result<T> {
    r.map_err(to_wire_error)
}
