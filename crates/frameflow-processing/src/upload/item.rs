use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::fs::File;
use tokio::io::AsyncRead;

/// Counts source handles opened by an iterator and not yet released.
#[derive(Debug, Clone, Default)]
pub struct HandleGauge {
    inner: Arc<GaugeCounters>,
}

#[derive(Debug, Default)]
struct GaugeCounters {
    open: AtomicUsize,
    peak: AtomicUsize,
    opened: AtomicUsize,
    released: AtomicUsize,
}

impl HandleGauge {
    /// Handles currently open.
    pub fn open(&self) -> usize {
        self.inner.open.load(Ordering::SeqCst)
    }

    /// Highest number of handles open at the same time.
    pub fn peak(&self) -> usize {
        self.inner.peak.load(Ordering::SeqCst)
    }

    /// Handles opened so far.
    pub fn opened(&self) -> usize {
        self.inner.opened.load(Ordering::SeqCst)
    }

    /// Handles released so far.
    pub fn released(&self) -> usize {
        self.inner.released.load(Ordering::SeqCst)
    }

    fn acquire(&self) {
        let now = self.inner.open.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.peak.fetch_max(now, Ordering::SeqCst);
        self.inner.opened.fetch_add(1, Ordering::SeqCst);
    }

    fn release(&self) {
        self.inner.open.fetch_sub(1, Ordering::SeqCst);
        self.inner.released.fetch_add(1, Ordering::SeqCst);
    }
}

/// One pending upload: an open source file and its destination key.
///
/// The item owns the file handle. The handle is closed exactly once, either
/// by [`UploadItem::complete`] after the upload attempt or when the item is
/// dropped on any other path.
#[derive(Debug)]
pub struct UploadItem {
    destination_key: String,
    content_length: Option<u64>,
    source: File,
    gauge: HandleGauge,
}

impl UploadItem {
    pub(crate) fn new(
        destination_key: String,
        content_length: Option<u64>,
        source: File,
        gauge: HandleGauge,
    ) -> Self {
        gauge.acquire();
        Self {
            destination_key,
            content_length,
            source,
            gauge,
        }
    }

    pub fn destination_key(&self) -> &str {
        &self.destination_key
    }

    pub fn content_length(&self) -> Option<u64> {
        self.content_length
    }

    /// The open source handle, for the upload call to read from.
    pub fn body(&mut self) -> &mut (dyn AsyncRead + Send + Unpin) {
        &mut self.source
    }

    /// After-upload hook: closes the source handle.
    pub fn complete(self) {
        tracing::trace!(key = %self.destination_key, "Releasing source handle");
    }
}

impl Drop for UploadItem {
    fn drop(&mut self) {
        self.gauge.release();
    }
}
