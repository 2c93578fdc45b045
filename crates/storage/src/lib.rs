//! Storage for conversion artifacts.
//!
//! Provides one interface over:
//! - S3-compatible object storage (AWS, MinIO)
//! - A local directory
//! - An in-memory store for tests

pub mod error;
pub mod object_store;

pub use self::object_store::{ArtifactStore, ArtifactStoreConfig};
pub use error::{StorageError, StorageResult};
