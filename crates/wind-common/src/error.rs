//! Error types for the quantization codec and its collaborators.

use thiserror::Error;

/// Result type alias using CodecError.
pub type CodecResult<T> = Result<T, CodecError>;

/// Primary error type for codec operations.
#[derive(Debug, Error)]
pub enum CodecError {
    // === Configuration Errors ===
    #[error("Invalid channel range [{min}, {max}]: min must be finite and below max")]
    InvalidRange { min: f64, max: f64 },

    #[error("Shape mismatch: expected {expected_rows}x{expected_cols}, got {actual_rows}x{actual_cols}")]
    ShapeMismatch {
        expected_rows: usize,
        expected_cols: usize,
        actual_rows: usize,
        actual_cols: usize,
    },

    // === Container Errors ===
    #[error("Truncated input: expected at least {expected} bytes, got {actual}")]
    TruncatedInput { expected: usize, actual: usize },

    #[error("Malformed header: {0}")]
    MalformedHeader(String),

    // === Buffer Errors ===
    #[error("Buffer holds {actual} bytes, expected {expected}")]
    BufferLength { expected: usize, actual: usize },

    // === Execution Errors ===
    #[error("Accelerator unavailable: {0}")]
    AcceleratorUnavailable(String),

    // === Collaborator Errors ===
    #[error("I/O error: {0}")]
    Io(String),

    #[error("Image error: {0}")]
    Image(String),

    #[error("Dataset error: {0}")]
    Dataset(String),
}

impl CodecError {
    /// Create a ShapeMismatch error from two `(rows, cols)` pairs.
    pub fn shape_mismatch(expected: (usize, usize), actual: (usize, usize)) -> Self {
        Self::ShapeMismatch {
            expected_rows: expected.0,
            expected_cols: expected.1,
            actual_rows: actual.0,
            actual_cols: actual.1,
        }
    }

    /// Create a Dataset error.
    pub fn dataset(msg: impl Into<String>) -> Self {
        Self::Dataset(msg.into())
    }

    /// Whether the error comes from caller configuration rather than data.
    pub fn is_configuration_error(&self) -> bool {
        matches!(self, CodecError::InvalidRange { .. } | CodecError::ShapeMismatch { .. })
    }
}

impl From<std::io::Error> for CodecError {
    fn from(err: std::io::Error) -> Self {
        CodecError::Io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_mismatch_message() {
        let err = CodecError::shape_mismatch((2, 3), (3, 2));
        assert_eq!(err.to_string(), "Shape mismatch: expected 2x3, got 3x2");
        assert!(err.is_configuration_error());
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.bin");
        let err: CodecError = io.into();
        assert!(matches!(err, CodecError::Io(ref msg) if msg.contains("missing.bin")));
        assert!(!err.is_configuration_error());
    }
}
