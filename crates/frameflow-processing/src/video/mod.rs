//! Video frame extraction

pub mod extractor;

pub use extractor::{FFmpegFrameExtractor, FrameExtractor};
