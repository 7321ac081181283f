//! Pull-based cursor over the files of a directory.

use frameflow_core::WalkErrorPolicy;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use tokio::fs::File;

use super::enumerator::{PathEnumerator, SkippedEntry};
use super::error::UploadError;
use super::item::{HandleGauge, UploadItem};

/// Cursor position of a [`DirectoryUploadIterator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IteratorState {
    /// Paths remain and no item is held.
    Ready,
    /// The current item holds a live handle and has not been handed off.
    ItemOpen,
    /// Every path was visited. Terminal.
    Exhausted,
    /// An enumeration, open or upload error was latched. Terminal.
    Failed,
}

/// Outcome of one cursor advance.
#[derive(Debug)]
pub enum Advance {
    Item(UploadItem),
    End,
    Failed(UploadError),
}

/// Yields one [`UploadItem`] per regular file under a directory.
///
/// Paths are captured once, at construction. Files are opened lazily on each
/// advance, so at most one handle produced by the iterator is alive at a time
/// as long as each item is completed before the next advance. Advancing while
/// an item is still held closes that item.
///
/// Destination keys are `destination_prefix + basename(path)`.
#[derive(Debug)]
pub struct DirectoryUploadIterator {
    destination_prefix: String,
    remaining: VecDeque<PathBuf>,
    current: Option<UploadItem>,
    error: Option<UploadError>,
    state: IteratorState,
    skipped: Vec<SkippedEntry>,
    gauge: HandleGauge,
}

impl DirectoryUploadIterator {
    /// Walk `root` and build a cursor over the files found.
    ///
    /// Performs blocking filesystem reads. An enumeration error (only
    /// possible under [`WalkErrorPolicy::Abort`]) is latched and the
    /// iterator starts in [`IteratorState::Failed`].
    pub fn new(
        root: impl Into<PathBuf>,
        destination_prefix: impl Into<String>,
        policy: WalkErrorPolicy,
    ) -> Self {
        let root = root.into();
        let destination_prefix = destination_prefix.into();

        let (remaining, skipped, error): (VecDeque<PathBuf>, Vec<SkippedEntry>, _) =
            match PathEnumerator::new(policy).enumerate(&root) {
                Ok(enumeration) => (enumeration.paths.into(), enumeration.skipped, None),
                Err(e) => (VecDeque::new(), Vec::new(), Some(e)),
            };

        let state = if error.is_some() {
            IteratorState::Failed
        } else if remaining.is_empty() {
            IteratorState::Exhausted
        } else {
            IteratorState::Ready
        };

        tracing::debug!(
            root = %root.display(),
            prefix = %destination_prefix,
            files = remaining.len(),
            skipped = skipped.len(),
            "Directory enumerated for upload"
        );

        Self {
            destination_prefix,
            remaining,
            current: None,
            error,
            state,
            skipped,
            gauge: HandleGauge::default(),
        }
    }

    pub fn destination_prefix(&self) -> &str {
        &self.destination_prefix
    }

    pub fn state(&self) -> IteratorState {
        self.state
    }

    /// Paths not yet visited.
    pub fn remaining(&self) -> usize {
        self.remaining.len()
    }

    /// Entries skipped by the walk under [`WalkErrorPolicy::Collect`].
    pub fn skipped(&self) -> &[SkippedEntry] {
        &self.skipped
    }

    /// Gauge over the handles this iterator has opened.
    pub fn handle_gauge(&self) -> HandleGauge {
        self.gauge.clone()
    }

    /// Move to the next file and open it.
    ///
    /// Returns `true` when an item is ready for [`current_item`](Self::current_item).
    /// Returns `false` once exhausted or failed; further calls keep returning
    /// `false` without side effects.
    pub async fn advance(&mut self) -> bool {
        if matches!(self.state, IteratorState::Failed | IteratorState::Exhausted) {
            return false;
        }

        // An item never handed off is closed here rather than leaked.
        self.current = None;

        let Some(path) = self.remaining.pop_front() else {
            self.state = IteratorState::Exhausted;
            return false;
        };

        let file = match File::open(&path).await {
            Ok(file) => file,
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "Failed to open file for upload");
                self.error = Some(UploadError::open(path, e));
                self.state = IteratorState::Failed;
                return false;
            }
        };

        let content_length = file.metadata().await.ok().map(|m| m.len());
        let destination_key = destination_key(&self.destination_prefix, &path);

        self.current = Some(UploadItem::new(
            destination_key,
            content_length,
            file,
            self.gauge.clone(),
        ));
        self.state = IteratorState::ItemOpen;
        true
    }

    /// Hand off the item opened by the last successful [`advance`](Self::advance).
    ///
    /// Fails with [`UploadError::NoCurrentItem`] before the first advance,
    /// after an advance returned `false`, or when the item was already taken.
    pub fn current_item(&mut self) -> Result<UploadItem, UploadError> {
        let item = self.current.take().ok_or(UploadError::NoCurrentItem)?;
        self.state = IteratorState::Ready;
        Ok(item)
    }

    /// The latched error, if any.
    pub fn last_error(&self) -> Option<&UploadError> {
        self.error.as_ref()
    }

    /// Latch a failure of the handed-off item's upload and stop the cursor.
    ///
    /// The first latched error wins; later ones are dropped.
    pub(crate) fn fail(&mut self, error: UploadError) {
        self.current = None;
        if self.error.is_none() {
            self.error = Some(error);
        }
        self.state = IteratorState::Failed;
    }

    /// Advance and hand off in one step.
    pub async fn next_item(&mut self) -> Advance {
        if self.advance().await {
            if let Ok(item) = self.current_item() {
                return Advance::Item(item);
            }
        }

        match &self.error {
            Some(e) => Advance::Failed(e.clone()),
            None => Advance::End,
        }
    }
}

fn destination_key(prefix: &str, path: &Path) -> String {
    let basename = path
        .file_name()
        .map(|name| name.to_string_lossy())
        .unwrap_or_default();
    format!("{}{}", prefix, basename)
}
