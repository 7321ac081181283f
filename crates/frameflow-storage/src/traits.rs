//! Storage abstraction trait
//!
//! This module defines the Storage trait that all storage backends must implement.

use crate::StorageBackend;
use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;
use tokio::io::AsyncRead;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Storage abstraction trait
///
/// The pipeline receives an `Arc<dyn Storage>` at construction, so tests can
/// substitute any backend without process-wide client state.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Stream an object to a local file, creating parent directories.
    ///
    /// Returns the number of bytes written.
    async fn download_to_file(
        &self,
        bucket: &str,
        key: &str,
        destination: &Path,
    ) -> StorageResult<u64>;

    /// Store the contents of `reader` at exactly `bucket`/`key`.
    ///
    /// The reader is borrowed: the caller keeps ownership of the underlying
    /// handle and is responsible for closing it, whatever the outcome.
    /// `content_length` is a hint only.
    ///
    /// Returns the number of bytes stored.
    async fn put_stream(
        &self,
        bucket: &str,
        key: &str,
        content_length: Option<u64>,
        reader: &mut (dyn AsyncRead + Send + Unpin),
    ) -> StorageResult<u64>;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}
