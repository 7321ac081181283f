//! Shared fixtures for upload tests.

use async_trait::async_trait;
use frameflow_storage::{Storage, StorageBackend, StorageError, StorageResult};
use std::path::Path;
use std::sync::Mutex;
use tempfile::TempDir;
use tokio::io::{AsyncRead, AsyncReadExt};

use super::item::HandleGauge;

/// Create a temp directory holding one file per name, each containing its own name.
pub fn frames_dir(names: &[&str]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for name in names {
        let path = dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, name.as_bytes()).unwrap();
    }
    dir
}

#[derive(Debug, Clone)]
pub struct PutRecord {
    pub bucket: String,
    pub key: String,
    pub body: Vec<u8>,
    pub open_handles: Option<usize>,
}

#[derive(Debug, Clone, Copy)]
enum Mode {
    Succeed,
    FailOn(usize),
    Stall,
}

/// In-memory storage that records every put.
pub struct RecordingStorage {
    mode: Mode,
    attempts: Mutex<usize>,
    puts: Mutex<Vec<PutRecord>>,
    gauge: Mutex<Option<HandleGauge>>,
}

impl RecordingStorage {
    pub fn new() -> Self {
        Self::with_mode(Mode::Succeed)
    }

    /// Fail the `attempt`-th put (1-based).
    pub fn failing_on(attempt: usize) -> Self {
        Self::with_mode(Mode::FailOn(attempt))
    }

    /// Never complete a put.
    pub fn stalling() -> Self {
        Self::with_mode(Mode::Stall)
    }

    fn with_mode(mode: Mode) -> Self {
        Self {
            mode,
            attempts: Mutex::new(0),
            puts: Mutex::new(Vec::new()),
            gauge: Mutex::new(None),
        }
    }

    /// Sample `gauge` at every put.
    pub fn watch(&self, gauge: HandleGauge) {
        *self.gauge.lock().unwrap() = Some(gauge);
    }

    pub fn attempts(&self) -> usize {
        *self.attempts.lock().unwrap()
    }

    pub fn puts(&self) -> Vec<PutRecord> {
        self.puts.lock().unwrap().clone()
    }

    pub fn keys(&self) -> Vec<String> {
        self.puts().into_iter().map(|p| p.key).collect()
    }
}

#[async_trait]
impl Storage for RecordingStorage {
    async fn download_to_file(
        &self,
        _bucket: &str,
        key: &str,
        _destination: &Path,
    ) -> StorageResult<u64> {
        Err(StorageError::NotFound(key.to_string()))
    }

    async fn put_stream(
        &self,
        bucket: &str,
        key: &str,
        _content_length: Option<u64>,
        reader: &mut (dyn AsyncRead + Send + Unpin),
    ) -> StorageResult<u64> {
        let attempt = {
            let mut attempts = self.attempts.lock().unwrap();
            *attempts += 1;
            *attempts
        };
        let open_handles = self.gauge.lock().unwrap().as_ref().map(|g| g.open());

        match self.mode {
            Mode::FailOn(n) if n == attempt => {
                return Err(StorageError::UploadFailed("injected failure".to_string()))
            }
            Mode::Stall => std::future::pending::<()>().await,
            _ => {}
        }

        let mut body = Vec::new();
        reader.read_to_end(&mut body).await?;
        let size = body.len() as u64;

        self.puts.lock().unwrap().push(PutRecord {
            bucket: bucket.to_string(),
            key: key.to_string(),
            body,
            open_handles,
        });

        Ok(size)
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}
