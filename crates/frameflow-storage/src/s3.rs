use crate::keys::{validate_bucket, validate_key};
use crate::traits::{Storage, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use futures::StreamExt;
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::buffered::BufWriter;
use object_store::path::Path as ObjectPath;
use object_store::Error as ObjectStoreError;
use object_store::{ObjectStoreExt, Result as ObjectResult};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWriteExt};
use tokio::sync::RwLock;

/// Bodies up to this size are sent with a single put; larger ones switch to
/// a multipart upload.
const UPLOAD_BUFFER_CAPACITY: usize = 8 * 1024 * 1024;

/// S3 storage implementation
///
/// Buckets are named per call, so one instance serves every bucket a
/// notification can point at. A client is built lazily for each bucket and
/// reused for the lifetime of the instance.
pub struct S3Storage {
    region: String,
    endpoint_url: Option<String>, // Custom endpoint for S3-compatible providers
    stores: RwLock<HashMap<String, AmazonS3>>,
}

impl S3Storage {
    /// Create a new S3Storage instance
    ///
    /// # Arguments
    /// * `region` - AWS region (or region identifier for S3-compatible providers)
    /// * `endpoint_url` - Optional custom endpoint URL for S3-compatible providers
    ///   (e.g., "http://localhost:9000" for MinIO)
    pub fn new(region: String, endpoint_url: Option<String>) -> Self {
        S3Storage {
            region,
            endpoint_url,
            stores: RwLock::new(HashMap::new()),
        }
    }

    async fn store_for(&self, bucket: &str) -> StorageResult<AmazonS3> {
        validate_bucket(bucket)?;

        if let Some(store) = self.stores.read().await.get(bucket) {
            return Ok(store.clone());
        }

        // Build AmazonS3 object store from environment and explicit settings.
        let mut builder = AmazonS3Builder::from_env()
            .with_region(self.region.clone())
            .with_bucket_name(bucket.to_string());

        if let Some(ref endpoint) = self.endpoint_url {
            let allow_http = endpoint.starts_with("http://");
            builder = builder
                .with_endpoint(endpoint.clone())
                .with_allow_http(allow_http);
        }

        let store = builder
            .build()
            .map_err(|e| StorageError::ConfigError(e.to_string()))?;

        self.stores
            .write()
            .await
            .insert(bucket.to_string(), store.clone());

        Ok(store)
    }
}

#[async_trait]
impl Storage for S3Storage {
    async fn download_to_file(
        &self,
        bucket: &str,
        key: &str,
        destination: &Path,
    ) -> StorageResult<u64> {
        let location = object_path(key)?;
        let store = self.store_for(bucket).await?;
        let start = std::time::Instant::now();

        let result: ObjectResult<_> = store.get(&location).await;

        let result = result.map_err(|e| match e {
            ObjectStoreError::NotFound { .. } => StorageError::NotFound(key.to_string()),
            other => {
                tracing::error!(
                    error = %other,
                    bucket = %bucket,
                    key = %key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 download failed"
                );
                StorageError::DownloadFailed(other.to_string())
            }
        })?;

        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::File::create(destination).await.map_err(|e| {
            StorageError::DownloadFailed(format!(
                "Failed to create file {}: {}",
                destination.display(),
                e
            ))
        })?;

        let mut stream = result.into_stream();
        let mut size = 0u64;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| {
                tracing::error!(
                    error = %e,
                    bucket = %bucket,
                    key = %key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 stream download error"
                );
                StorageError::DownloadFailed(e.to_string())
            })?;
            file.write_all(&chunk).await?;
            size += chunk.len() as u64;
        }
        file.flush().await?;

        tracing::info!(
            bucket = %bucket,
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 download successful"
        );

        Ok(size)
    }

    async fn put_stream(
        &self,
        bucket: &str,
        key: &str,
        content_length: Option<u64>,
        reader: &mut (dyn AsyncRead + Send + Unpin),
    ) -> StorageResult<u64> {
        let location = object_path(key)?;
        let store = self.store_for(bucket).await?;
        let start = std::time::Instant::now();

        tracing::debug!(
            bucket = %bucket,
            key = %key,
            content_length = ?content_length,
            "Starting S3 upload"
        );
        let mut writer =
            BufWriter::with_capacity(Arc::new(store), location, UPLOAD_BUFFER_CAPACITY);

        let result = match tokio::io::copy(reader, &mut writer).await {
            Ok(size) => writer.shutdown().await.map(|()| size),
            Err(e) => {
                if let Err(abort) = writer.abort().await {
                    tracing::warn!(
                        error = %abort,
                        bucket = %bucket,
                        key = %key,
                        "Failed to abort partial S3 upload"
                    );
                }
                Err(e)
            }
        };

        let size = result.map_err(|e| {
            tracing::error!(
                error = %e,
                bucket = %bucket,
                key = %key,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "S3 upload failed"
            );
            StorageError::UploadFailed(e.to_string())
        })?;

        tracing::info!(
            bucket = %bucket,
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 upload successful"
        );

        Ok(size)
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::S3
    }
}

/// Object location for `key`, kept byte-for-byte.
///
/// Keys are parsed rather than converted with `ObjectPath::from`, which
/// escapes reserved characters. Keys that would not survive unchanged, such
/// as ones with empty segments or a trailing `/`, are refused.
fn object_path(key: &str) -> StorageResult<ObjectPath> {
    validate_key(key)?;
    let location = ObjectPath::parse(key)
        .map_err(|e| StorageError::InvalidKey(format!("{}: {}", key, e)))?;
    if location.as_ref() != key {
        return Err(StorageError::InvalidKey(format!(
            "Storage key cannot be stored verbatim: {:?}",
            key
        )));
    }
    Ok(location)
}
