//! Validation bounds for index names and dimensions
//!
//! Violations return `Error::InvalidInput` so they surface to clients as
//! structured validation errors.

use crate::error::{Error, Result};

/// Maximum index name length in bytes
pub const MAX_INDEX_NAME_BYTES: usize = 255;

/// Maximum vector dimension
pub const MAX_DIMENSION: usize = 65_536;

/// Validate an index name
///
/// Names must be non-empty, at most [`MAX_INDEX_NAME_BYTES`] bytes, and
/// must not contain NUL.
pub fn validate_index_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::InvalidInput("index name must not be empty".to_string()));
    }
    if name.len() > MAX_INDEX_NAME_BYTES {
        return Err(Error::InvalidInput(format!(
            "index name is {} bytes, maximum is {}",
            name.len(),
            MAX_INDEX_NAME_BYTES
        )));
    }
    if name.contains('\0') {
        return Err(Error::InvalidInput(
            "index name must not contain NUL".to_string(),
        ));
    }
    Ok(())
}

/// Validate a vector dimension given at index creation
pub fn validate_dimension(dimension: usize) -> Result<()> {
    if dimension == 0 || dimension > MAX_DIMENSION {
        return Err(Error::InvalidInput(format!(
            "dimension must be between 1 and {}, got {}",
            MAX_DIMENSION, dimension
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_name_bounds() {
        assert!(validate_index_name("vectors").is_ok());
        assert!(validate_index_name(&"a".repeat(MAX_INDEX_NAME_BYTES)).is_ok());
        assert!(validate_index_name("").is_err());
        assert!(validate_index_name(&"a".repeat(MAX_INDEX_NAME_BYTES + 1)).is_err());
        assert!(validate_index_name("bad\0name").is_err());
    }

    #[test]
    fn test_dimension_bounds() {
        assert!(validate_dimension(1).is_ok());
        assert!(validate_dimension(MAX_DIMENSION).is_ok());
        assert!(matches!(validate_dimension(0), Err(Error::InvalidInput(_))));
        assert!(validate_dimension(MAX_DIMENSION + 1).is_err());
    }
}
