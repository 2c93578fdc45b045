//! Error types for artifact storage.

use thiserror::Error;

/// Result type alias using StorageError.
pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    ObjectStore(String),

    #[error("Invalid storage configuration: {0}")]
    Config(String),

    #[error("Got {locals} local paths for {remotes} remote keys")]
    LengthMismatch { locals: usize, remotes: usize },

    #[error("I/O error: {0}")]
    Io(String),
}

impl StorageError {
    /// Map an object store failure for `key`.
    pub(crate) fn from_store(key: &str, err: object_store::Error) -> Self {
        match err {
            object_store::Error::NotFound { .. } => Self::NotFound(key.to_string()),
            other => Self::ObjectStore(format!("{}: {}", key, other)),
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::Io(err.to_string())
    }
}
