//! Batch directory-to-object-store upload.

mod driver;
mod enumerator;
mod error;
mod item;
mod iterator;
#[cfg(test)]
pub(crate) mod test_support;

pub use driver::{BatchUploadDriver, BatchUploadSummary};
pub use enumerator::{Enumeration, PathEnumerator, SkippedEntry};
pub use error::UploadError;
pub use item::{HandleGauge, UploadItem};
pub use iterator::{Advance, DirectoryUploadIterator, IteratorState};
