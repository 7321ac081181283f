//! Drives a [`DirectoryUploadIterator`] to exhaustion against a [`Storage`].

use frameflow_storage::Storage;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::error::UploadError;
use super::iterator::{Advance, DirectoryUploadIterator};

/// What a successful batch uploaded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchUploadSummary {
    pub uploaded: usize,
    pub bytes: u64,
    /// Keys in dispatch order.
    pub keys: Vec<String>,
}

/// Uploads every item of an iterator, one at a time, into a single bucket.
///
/// The first failure ends the batch: an open error latched by the iterator,
/// a failed put, or cancellation. Put failures and cancellation are latched
/// into the iterator too, so it reports no further items. Objects stored before the failure are left
/// in place. Each item's handle is released after its put attempt on every
/// path, including cancellation.
pub struct BatchUploadDriver {
    storage: Arc<dyn Storage>,
    bucket: String,
    cancel: CancellationToken,
}

impl BatchUploadDriver {
    pub fn new(storage: Arc<dyn Storage>, bucket: impl Into<String>) -> Self {
        Self {
            storage,
            bucket: bucket.into(),
            cancel: CancellationToken::new(),
        }
    }

    /// Abort the batch when `cancel` fires.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    #[tracing::instrument(
        skip(self, iter),
        fields(bucket = %self.bucket, prefix = %iter.destination_prefix())
    )]
    pub async fn run(
        &self,
        iter: &mut DirectoryUploadIterator,
    ) -> Result<BatchUploadSummary, UploadError> {
        let mut summary = BatchUploadSummary::default();

        loop {
            if self.cancel.is_cancelled() {
                tracing::warn!(uploaded = summary.uploaded, "Batch upload cancelled");
                iter.fail(UploadError::Cancelled);
                return Err(UploadError::Cancelled);
            }

            let mut item = match iter.next_item().await {
                Advance::Item(item) => item,
                Advance::End => break,
                Advance::Failed(e) => {
                    tracing::error!(error = %e, uploaded = summary.uploaded, "Batch upload stopped");
                    return Err(e);
                }
            };

            let key = item.destination_key().to_string();
            let content_length = item.content_length();

            let outcome = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => None,
                result = self.storage.put_stream(&self.bucket, &key, content_length, item.body()) => Some(result),
            };

            item.complete();

            match outcome {
                None => {
                    tracing::warn!(key = %key, uploaded = summary.uploaded, "Batch upload cancelled");
                    iter.fail(UploadError::Cancelled);
                    return Err(UploadError::Cancelled);
                }
                Some(Err(e)) => {
                    tracing::error!(key = %key, error = %e, uploaded = summary.uploaded, "Batch upload stopped");
                    let error = UploadError::upload(key, e);
                    iter.fail(error.clone());
                    return Err(error);
                }
                Some(Ok(size)) => {
                    tracing::debug!(key = %key, size_bytes = size, "Uploaded");
                    summary.uploaded += 1;
                    summary.bytes += size;
                    summary.keys.push(key);
                }
            }
        }

        tracing::info!(
            uploaded = summary.uploaded,
            size_bytes = summary.bytes,
            "Batch upload complete"
        );

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upload::iterator::IteratorState;
    use crate::upload::test_support::{frames_dir, RecordingStorage};
    use frameflow_core::WalkErrorPolicy;
    use std::time::Duration;

    #[tokio::test]
    async fn uploads_every_file_under_prefix() {
        let dir = frames_dir(&["output_0001.jpg", "output_0002.jpg"]);
        let storage = Arc::new(RecordingStorage::new());
        let mut iter =
            DirectoryUploadIterator::new(dir.path(), "video.mp4-out/", WalkErrorPolicy::Ignore);
        storage.watch(iter.handle_gauge());

        let driver = BatchUploadDriver::new(storage.clone(), "bucket");
        let summary = driver.run(&mut iter).await.unwrap();

        assert_eq!(
            summary.keys,
            vec![
                "video.mp4-out/output_0001.jpg".to_string(),
                "video.mp4-out/output_0002.jpg".to_string(),
            ]
        );
        assert_eq!(summary.uploaded, 2);
        assert_eq!(summary.bytes, 30);

        let puts = storage.puts();
        assert_eq!(puts.len(), 2);
        assert!(puts.iter().all(|p| p.bucket == "bucket"));
        assert_eq!(puts[0].body, b"output_0001.jpg");
        // Only the item being uploaded was open at dispatch.
        assert!(puts.iter().all(|p| p.open_handles == Some(1)));

        let gauge = iter.handle_gauge();
        assert_eq!(gauge.open(), 0);
        assert_eq!(gauge.peak(), 1);
        assert_eq!(gauge.released(), 2);
    }

    #[tokio::test]
    async fn empty_directory_succeeds_without_puts() {
        let dir = frames_dir(&[]);
        let storage = Arc::new(RecordingStorage::new());
        let mut iter = DirectoryUploadIterator::new(dir.path(), "p/", WalkErrorPolicy::Ignore);

        let summary = BatchUploadDriver::new(storage.clone(), "bucket")
            .run(&mut iter)
            .await
            .unwrap();

        assert_eq!(summary, BatchUploadSummary::default());
        assert!(storage.puts().is_empty());
    }

    #[tokio::test]
    async fn put_failure_stops_at_failing_item() {
        let names = ["f1.jpg", "f2.jpg", "f3.jpg", "f4.jpg", "f5.jpg"];
        for k in 1..=names.len() {
            let dir = frames_dir(&names);
            let storage = Arc::new(RecordingStorage::failing_on(k));
            let mut iter = DirectoryUploadIterator::new(dir.path(), "p/", WalkErrorPolicy::Ignore);

            let result = BatchUploadDriver::new(storage.clone(), "bucket")
                .run(&mut iter)
                .await;

            assert!(
                matches!(&result, Err(UploadError::Upload { key, .. }) if key == &format!("p/f{}.jpg", k))
            );
            assert_eq!(storage.attempts(), k);
            assert_eq!(storage.puts().len(), k - 1);

            let gauge = iter.handle_gauge();
            assert_eq!(gauge.opened(), k);
            assert_eq!(gauge.released(), k);
            assert_eq!(gauge.open(), 0);
        }
    }

    #[tokio::test]
    async fn put_failure_is_latched_in_iterator() {
        let dir = frames_dir(&["a.jpg", "b.jpg", "c.jpg"]);
        let storage = Arc::new(RecordingStorage::failing_on(1));
        let mut iter = DirectoryUploadIterator::new(dir.path(), "p/", WalkErrorPolicy::Ignore);
        let driver = BatchUploadDriver::new(storage.clone(), "bucket");

        let result = driver.run(&mut iter).await;
        assert!(matches!(result, Err(UploadError::Upload { .. })));

        assert_eq!(iter.state(), IteratorState::Failed);
        assert!(
            matches!(iter.last_error(), Some(UploadError::Upload { key, .. }) if key == "p/a.jpg")
        );
        assert!(!iter.advance().await);

        // Running again reports the latched failure and uploads nothing.
        let rerun = driver.run(&mut iter).await;
        assert!(matches!(rerun, Err(UploadError::Upload { key, .. }) if key == "p/a.jpg"));
        assert_eq!(storage.attempts(), 1);
        assert!(storage.puts().is_empty());
        assert_eq!(iter.handle_gauge().opened(), 1);
    }

    #[tokio::test]
    async fn open_failure_is_reported_after_earlier_uploads() {
        let dir = frames_dir(&["a.jpg", "b.jpg", "c.jpg"]);
        let storage = Arc::new(RecordingStorage::new());
        let mut iter = DirectoryUploadIterator::new(dir.path(), "p/", WalkErrorPolicy::Ignore);
        std::fs::remove_file(dir.path().join("b.jpg")).unwrap();

        let result = BatchUploadDriver::new(storage.clone(), "bucket")
            .run(&mut iter)
            .await;

        assert!(matches!(result, Err(UploadError::Open { ref path, .. }) if path.ends_with("b.jpg")));
        assert_eq!(storage.keys(), vec!["p/a.jpg".to_string()]);
        // c.jpg was never opened.
        assert_eq!(iter.handle_gauge().opened(), 1);
    }

    #[tokio::test]
    async fn cancellation_releases_in_flight_item() {
        let dir = frames_dir(&["a.jpg", "b.jpg"]);
        let storage = Arc::new(RecordingStorage::stalling());
        let mut iter = DirectoryUploadIterator::new(dir.path(), "p/", WalkErrorPolicy::Ignore);
        let gauge = iter.handle_gauge();

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let result = BatchUploadDriver::new(storage.clone(), "bucket")
            .with_cancellation(cancel)
            .run(&mut iter)
            .await;

        assert!(matches!(result, Err(UploadError::Cancelled)));
        assert!(matches!(iter.last_error(), Some(UploadError::Cancelled)));
        assert!(!iter.advance().await);
        assert_eq!(storage.attempts(), 1);
        assert_eq!(gauge.opened(), 1);
        assert_eq!(gauge.released(), 1);
        assert_eq!(gauge.open(), 0);
    }

    #[tokio::test]
    async fn cancelled_before_start_opens_nothing() {
        let dir = frames_dir(&["a.jpg"]);
        let storage = Arc::new(RecordingStorage::new());
        let mut iter = DirectoryUploadIterator::new(dir.path(), "p/", WalkErrorPolicy::Ignore);

        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = BatchUploadDriver::new(storage.clone(), "bucket")
            .with_cancellation(cancel)
            .run(&mut iter)
            .await;

        assert!(matches!(result, Err(UploadError::Cancelled)));
        assert_eq!(storage.attempts(), 0);
        assert_eq!(iter.handle_gauge().opened(), 0);
    }
}
