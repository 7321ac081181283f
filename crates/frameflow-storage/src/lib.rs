//! Frameflow Storage Library
//!
//! This crate provides the object-store abstraction used by the frame pipeline
//! and its implementations for S3 and the local filesystem.
//!
//! # Addressing
//!
//! Objects are addressed by `bucket` + `key`. Keys are stored verbatim: the
//! pipeline derives them as `<source key><suffix>/<frame file name>`.
//! Keys must not be empty, contain `..` segments, or start with `/`.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use factory::create_storage;
pub use frameflow_core::StorageBackend;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use traits::{Storage, StorageError, StorageResult};
