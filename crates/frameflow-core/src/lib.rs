//! Frameflow Core Library
//!
//! This crate provides configuration, the trigger notification model and the
//! storage backend type shared across all Frameflow components.

pub mod config;
pub mod models;
pub mod storage_types;

// Re-export commonly used types
pub use config::{PipelineConfig, WalkErrorPolicy};
pub use models::{ObjectRef, StorageEvent, TriggerError};
pub use storage_types::StorageBackend;
