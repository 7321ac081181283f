use frameflow_storage::StorageError;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Errors that end a batch upload.
///
/// Cloneable so the iterator can keep its latched error while also handing
/// it to the driver.
#[derive(Debug, Clone, Error)]
pub enum UploadError {
    #[error("Failed to walk {path}: {message}")]
    Enumeration { path: PathBuf, message: String },

    #[error("Failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: Arc<std::io::Error>,
    },

    #[error("Failed to upload {key}: {source}")]
    Upload {
        key: String,
        #[source]
        source: Arc<StorageError>,
    },

    #[error("Upload cancelled")]
    Cancelled,

    #[error("No current item: advance() has not returned true since the last hand-off")]
    NoCurrentItem,
}

impl UploadError {
    pub(crate) fn open(path: PathBuf, source: std::io::Error) -> Self {
        UploadError::Open {
            path,
            source: Arc::new(source),
        }
    }

    pub(crate) fn upload(key: String, source: StorageError) -> Self {
        UploadError::Upload {
            key,
            source: Arc::new(source),
        }
    }
}
