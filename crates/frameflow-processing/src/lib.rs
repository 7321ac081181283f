//! Frameflow processing: frame extraction and batch upload.
//!
//! The pipeline downloads a video, extracts still frames with an external
//! tool, and uploads every produced file under a key prefix derived from the
//! source key. The upload half is a pull-based iterator over the frame
//! directory driven by [`BatchUploadDriver`], which keeps at most one source
//! file open at a time.

pub mod pipeline;
pub mod upload;
pub mod video;

pub use pipeline::{MediaPipelineOrchestrator, OrchestratorConfig};
pub use upload::{
    Advance, BatchUploadDriver, BatchUploadSummary, DirectoryUploadIterator, Enumeration,
    HandleGauge, IteratorState, PathEnumerator, SkippedEntry, UploadError, UploadItem,
};
pub use video::{FFmpegFrameExtractor, FrameExtractor};
