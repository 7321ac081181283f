//! Recursive listing of the regular files under a directory.

use frameflow_core::WalkErrorPolicy;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::error::UploadError;

/// An entry the walk could not read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEntry {
    pub path: Option<PathBuf>,
    pub message: String,
}

/// Result of one directory walk.
#[derive(Debug, Clone, Default)]
pub struct Enumeration {
    /// Regular files in traversal order.
    pub paths: Vec<PathBuf>,
    /// Unreadable entries; only populated under [`WalkErrorPolicy::Collect`].
    pub skipped: Vec<SkippedEntry>,
}

/// Lists regular files under a root directory.
///
/// Siblings are visited in file-name order, so frames numbered by the
/// extractor come back in frame order. Directories and symlinks are not
/// listed. No file is opened.
#[derive(Debug, Clone, Copy, Default)]
pub struct PathEnumerator {
    policy: WalkErrorPolicy,
}

impl PathEnumerator {
    pub fn new(policy: WalkErrorPolicy) -> Self {
        Self { policy }
    }

    pub fn enumerate(&self, root: &Path) -> Result<Enumeration, UploadError> {
        let mut enumeration = Enumeration::default();

        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().map(Path::to_path_buf);
                    match self.policy {
                        WalkErrorPolicy::Ignore => {
                            tracing::debug!(root = %root.display(), error = %e, "Ignoring unreadable entry");
                        }
                        WalkErrorPolicy::Collect => {
                            tracing::warn!(root = %root.display(), error = %e, "Skipping unreadable entry");
                            enumeration.skipped.push(SkippedEntry {
                                path,
                                message: e.to_string(),
                            });
                        }
                        WalkErrorPolicy::Abort => {
                            return Err(UploadError::Enumeration {
                                path: path.unwrap_or_else(|| root.to_path_buf()),
                                message: e.to_string(),
                            });
                        }
                    }
                    continue;
                }
            };

            if entry.file_type().is_file() {
                enumeration.paths.push(entry.into_path());
            }
        }

        Ok(enumeration)
    }
}
