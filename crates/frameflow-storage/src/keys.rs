//! Shared key validation for storage backends.

use crate::{StorageError, StorageResult};

/// Reject keys that are empty, absolute, contain a `..` segment or a NUL byte.
///
/// Both backends run every key through this before use, so a key accepted by
/// one backend is accepted by the other.
pub fn validate_key(key: &str) -> StorageResult<()> {
    if key.is_empty() {
        return Err(StorageError::InvalidKey("Storage key is empty".to_string()));
    }
    if key.starts_with('/') {
        return Err(StorageError::InvalidKey(format!(
            "Storage key must not start with '/': {}",
            key
        )));
    }
    if key.contains('\0') {
        return Err(StorageError::InvalidKey(format!(
            "Storage key contains a NUL byte: {:?}",
            key
        )));
    }
    if key.split('/').any(|segment| segment == "..") {
        return Err(StorageError::InvalidKey(format!(
            "Storage key contains a parent segment: {}",
            key
        )));
    }
    Ok(())
}

/// Reject bucket names that could not be a single path component.
pub fn validate_bucket(bucket: &str) -> StorageResult<()> {
    if bucket.is_empty() || bucket == "." || bucket == ".." || bucket.contains('/') {
        return Err(StorageError::InvalidKey(format!(
            "Invalid bucket name: {:?}",
            bucket
        )));
    }
    Ok(())
}
