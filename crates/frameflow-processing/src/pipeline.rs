//! Frame pipeline orchestration: download → extract frames → batch upload.

use anyhow::{Context, Result};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use frameflow_core::{ObjectRef, PipelineConfig, StorageEvent, WalkErrorPolicy};
use frameflow_storage::keys::validate_key;
use frameflow_storage::Storage;

use crate::upload::{BatchUploadDriver, BatchUploadSummary, DirectoryUploadIterator};
use crate::video::FrameExtractor;

/// Config for pipeline orchestration (work layout, walk policy, deadline).
#[derive(Clone, Debug)]
pub struct OrchestratorConfig {
    pub work_dir: PathBuf,
    pub output_suffix: String,
    pub walk_error_policy: WalkErrorPolicy,
    pub upload_timeout: Option<Duration>,
    pub cleanup_work_files: bool,
}

impl From<&PipelineConfig> for OrchestratorConfig {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            work_dir: config.work_dir.clone(),
            output_suffix: config.output_suffix.clone(),
            walk_error_policy: config.walk_error_policy,
            upload_timeout: config.upload_timeout,
            cleanup_work_files: config.cleanup_work_files,
        }
    }
}

/// Runs the full pipeline for each object named by a trigger notification.
///
/// Frames for `bucket/key` are uploaded to the same bucket under
/// `<key><output_suffix>/`.
pub struct MediaPipelineOrchestrator {
    storage: Arc<dyn Storage>,
    extractor: Arc<dyn FrameExtractor>,
    config: OrchestratorConfig,
    cancel: CancellationToken,
}

impl MediaPipelineOrchestrator {
    pub fn new(
        storage: Arc<dyn Storage>,
        extractor: Arc<dyn FrameExtractor>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            storage,
            extractor,
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Abort in-flight uploads when `cancel` fires.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Process every record of a notification in order, stopping at the first failure.
    pub async fn handle_event(&self, event: &StorageEvent) -> Result<Vec<BatchUploadSummary>> {
        let objects = event.objects().context("Invalid trigger notification")?;

        let mut summaries = Vec::with_capacity(objects.len());
        for object in &objects {
            summaries.push(self.process_object(object).await?);
        }
        Ok(summaries)
    }

    /// Run the full pipeline for one object: download → extract → upload.
    #[tracing::instrument(skip(self), fields(bucket = %object.bucket, key = %object.key))]
    pub async fn process_object(&self, object: &ObjectRef) -> Result<BatchUploadSummary> {
        validate_key(&object.key).context("Refusing unsafe object key")?;

        let input_path = self.config.work_dir.join(&object.key);
        let output_dir = with_suffix(&input_path, &self.config.output_suffix);

        let result = self.run_stages(object, &input_path, &output_dir).await;

        if self.config.cleanup_work_files {
            cleanup(&input_path, &output_dir).await;
        }

        match &result {
            Ok(summary) => tracing::info!(
                uploaded = summary.uploaded,
                size_bytes = summary.bytes,
                "Frame pipeline completed successfully"
            ),
            Err(e) => tracing::error!(error = %format!("{:#}", e), "Frame pipeline failed"),
        }

        result
    }

    async fn run_stages(
        &self,
        object: &ObjectRef,
        input_path: &Path,
        output_dir: &Path,
    ) -> Result<BatchUploadSummary> {
        tracing::info!(
            backend = %self.storage.backend_type(),
            path = %input_path.display(),
            "Downloading video from storage"
        );
        let size = self
            .storage
            .download_to_file(&object.bucket, &object.key, input_path)
            .await
            .context("Failed to download video from storage")?;
        tracing::info!(path = %input_path.display(), size_bytes = size, "Downloaded");

        self.extractor
            .extract(input_path, output_dir)
            .await
            .context("Failed to extract frames")?;

        let prefix = format!("{}{}/", object.key, self.config.output_suffix);
        let root = output_dir.to_path_buf();
        let policy = self.config.walk_error_policy;
        let enumeration_prefix = prefix.clone();
        let mut iter = tokio::task::spawn_blocking(move || {
            DirectoryUploadIterator::new(root, enumeration_prefix, policy)
        })
        .await
        .context("Frame directory walk panicked")?;

        let cancel = self.cancel.child_token();
        let deadline = self.config.upload_timeout.map(|timeout| {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(timeout).await;
                tracing::warn!(timeout_secs = timeout.as_secs(), "Upload deadline reached");
                cancel.cancel();
            })
        });

        tracing::info!(prefix = %prefix, files = iter.remaining(), "Uploading frames to storage");
        let result = BatchUploadDriver::new(self.storage.clone(), object.bucket.clone())
            .with_cancellation(cancel)
            .run(&mut iter)
            .await;

        if let Some(deadline) = deadline {
            deadline.abort();
        }

        result.with_context(|| format!("Failed to upload frames to {}/{}", object.bucket, prefix))
    }
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

async fn cleanup(input_path: &Path, output_dir: &Path) {
    if let Err(e) = tokio::fs::remove_file(input_path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(path = %input_path.display(), error = %e, "Failed to remove downloaded video");
        }
    }
    if let Err(e) = tokio::fs::remove_dir_all(output_dir).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(path = %output_dir.display(), error = %e, "Failed to remove frame directory");
        }
    }
}
