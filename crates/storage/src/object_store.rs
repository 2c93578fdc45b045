//! Object storage for converted artifacts (S3 compatible).

use bytes::Bytes;
use futures::stream::{self, StreamExt, TryStreamExt};
use object_store::{
    aws::AmazonS3Builder, local::LocalFileSystem, memory::InMemory, path::Path, ObjectStore,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::error::{StorageError, StorageResult};

/// Transfers in flight at once.
const MAX_CONCURRENT_TRANSFERS: usize = 8;

/// Configuration for the artifact bucket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactStoreConfig {
    /// Custom endpoint (MinIO, LocalStack); `None` uses AWS
    pub endpoint: Option<String>,
    /// Bucket name
    pub bucket: String,
    /// Key prefix under which artifacts live
    pub prefix: String,
    /// Access key ID
    pub access_key_id: Option<String>,
    /// Secret access key
    pub secret_access_key: Option<String>,
    /// Session token for temporary credentials
    pub session_token: Option<String>,
    /// AWS region
    pub region: String,
    /// Allow HTTP endpoints
    pub allow_http: bool,
}

impl Default for ArtifactStoreConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            bucket: "wind-artifacts".to_string(),
            prefix: String::new(),
            access_key_id: None,
            secret_access_key: None,
            session_token: None,
            region: "us-east-1".to_string(),
            allow_http: false,
        }
    }
}

impl ArtifactStoreConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("S3_ENDPOINT") {
            config.endpoint = Some(val);
        }
        if let Ok(val) = std::env::var("S3_BUCKET") {
            config.bucket = val;
        }
        if let Ok(val) = std::env::var("S3_PREFIX") {
            config.prefix = val;
        }
        config.access_key_id = std::env::var("AWS_ACCESS_KEY_ID").ok();
        config.secret_access_key = std::env::var("AWS_SECRET_ACCESS_KEY").ok();
        config.session_token = std::env::var("AWS_SESSION_TOKEN").ok();
        if let Ok(val) = std::env::var("AWS_REGION").or_else(|_| std::env::var("REGION_NAME")) {
            config.region = val;
        }
        if let Ok(val) = std::env::var("S3_ALLOW_HTTP") {
            config.allow_http = val.to_lowercase() == "true" || val == "1";
        }

        config
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.bucket.is_empty() {
            return Err("bucket must not be empty".to_string());
        }
        if self.access_key_id.is_some() != self.secret_access_key.is_some() {
            return Err("access key id and secret access key must be set together".to_string());
        }
        if let Some(endpoint) = &self.endpoint {
            if endpoint.starts_with("http://") && !self.allow_http {
                return Err(format!("endpoint {} needs allow_http", endpoint));
            }
        }
        Ok(())
    }
}

/// Client for uploading and downloading conversion artifacts.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    store: Arc<dyn ObjectStore>,
    prefix: String,
    label: String,
}

impl ArtifactStore {
    /// Create an S3 client from config.
    pub fn new(config: &ArtifactStoreConfig) -> StorageResult<Self> {
        config.validate().map_err(StorageError::Config)?;

        let mut builder = AmazonS3Builder::new()
            .with_bucket_name(&config.bucket)
            .with_region(&config.region)
            .with_allow_http(config.allow_http);

        if let Some(endpoint) = &config.endpoint {
            builder = builder.with_endpoint(endpoint);
        }
        if let (Some(key), Some(secret)) = (&config.access_key_id, &config.secret_access_key) {
            builder = builder
                .with_access_key_id(key)
                .with_secret_access_key(secret);
        }
        if let Some(token) = &config.session_token {
            builder = builder.with_token(token);
        }

        let store = builder
            .build()
            .map_err(|e| StorageError::Config(format!("Failed to create S3 client: {}", e)))?;

        Ok(Self {
            store: Arc::new(store),
            prefix: config.prefix.clone(),
            label: format!("s3://{}", config.bucket),
        })
    }

    /// An in-process store, for tests.
    pub fn in_memory() -> Self {
        Self {
            store: Arc::new(InMemory::new()),
            prefix: String::new(),
            label: "memory".to_string(),
        }
    }

    /// A store rooted at a local directory.
    pub fn local(root: &std::path::Path) -> StorageResult<Self> {
        std::fs::create_dir_all(root)?;
        let store = LocalFileSystem::new_with_prefix(root)
            .map_err(|e| StorageError::Config(format!("{}: {}", root.display(), e)))?;
        Ok(Self {
            store: Arc::new(store),
            prefix: String::new(),
            label: format!("file://{}", root.display()),
        })
    }

    /// Place every key under `prefix`.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Where this store points, for logs.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Full object key for an artifact name.
    pub fn key(&self, artifact: &str) -> Path {
        let prefix = self.prefix.trim_matches('/');
        if prefix.is_empty() {
            Path::from(artifact)
        } else {
            Path::from(format!("{}/{}", prefix, artifact))
        }
    }

    /// Check if an artifact exists.
    #[instrument(skip(self), fields(store = %self.label))]
    pub async fn exists(&self, artifact: &str) -> StorageResult<bool> {
        match self.store.head(&self.key(artifact)).await {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(e) => Err(StorageError::from_store(artifact, e)),
        }
    }

    /// Write bytes to an artifact.
    #[instrument(skip(self, data), fields(store = %self.label))]
    pub async fn put(&self, artifact: &str, data: Bytes) -> StorageResult<()> {
        debug!(size = data.len(), "Writing object");
        self.store
            .put(&self.key(artifact), data.into())
            .await
            .map_err(|e| StorageError::from_store(artifact, e))?;
        Ok(())
    }

    /// Read an artifact's bytes.
    #[instrument(skip(self), fields(store = %self.label))]
    pub async fn get(&self, artifact: &str) -> StorageResult<Bytes> {
        let result = self
            .store
            .get(&self.key(artifact))
            .await
            .map_err(|e| StorageError::from_store(artifact, e))?;

        let bytes = result
            .bytes()
            .await
            .map_err(|e| StorageError::from_store(artifact, e))?;

        debug!(size = bytes.len(), "Read object");
        Ok(bytes)
    }

    /// Upload local files, pairwise, to remote artifact names.
    pub async fn upload_files(&self, locals: &[PathBuf], remotes: &[String]) -> StorageResult<()> {
        check_pairs(locals.len(), remotes.len())?;
        stream::iter(locals.iter().zip(remotes))
            .map(|(local, remote)| async move {
                let data = tokio::fs::read(local).await?;
                self.put(remote, Bytes::from(data)).await
            })
            .buffer_unordered(MAX_CONCURRENT_TRANSFERS)
            .try_collect::<Vec<()>>()
            .await?;
        info!(count = remotes.len(), store = %self.label, "Uploaded artifacts");
        Ok(())
    }

    /// Download remote artifacts, pairwise, to local files.
    pub async fn download_files(
        &self,
        remotes: &[String],
        locals: &[PathBuf],
    ) -> StorageResult<()> {
        check_pairs(locals.len(), remotes.len())?;
        stream::iter(remotes.iter().zip(locals))
            .map(|(remote, local)| async move {
                let data = self.get(remote).await?;
                if let Some(parent) = local.parent() {
                    tokio::fs::create_dir_all(parent).await?;
                }
                tokio::fs::write(local, &data).await?;
                Ok::<_, StorageError>(())
            })
            .buffer_unordered(MAX_CONCURRENT_TRANSFERS)
            .try_collect::<Vec<()>>()
            .await?;
        info!(count = remotes.len(), store = %self.label, "Downloaded artifacts");
        Ok(())
    }
}

fn check_pairs(locals: usize, remotes: usize) -> StorageResult<()> {
    if locals != remotes {
        return Err(StorageError::LengthMismatch { locals, remotes });
    }
    Ok(())
}
