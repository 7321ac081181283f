//! Domain models

pub mod event;

pub use event::{ObjectRef, StorageEvent, TriggerError};
