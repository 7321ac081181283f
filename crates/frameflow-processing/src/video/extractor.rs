//! Still-frame extraction from a video file.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use frameflow_core::PipelineConfig;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

/// Writes zero or more image files for `input` into `output_dir`.
#[async_trait]
pub trait FrameExtractor: Send + Sync {
    async fn extract(&self, input: &Path, output_dir: &Path) -> Result<()>;
}

/// Extracts frames at a fixed rate with the `ffmpeg` binary.
///
/// Frames are numbered sequentially using `frame_pattern`
/// (e.g. `output_%04d.jpg`).
#[derive(Debug, Clone)]
pub struct FFmpegFrameExtractor {
    ffmpeg_path: String,
    frame_rate: String,
    frame_pattern: String,
}

impl FFmpegFrameExtractor {
    pub fn new(ffmpeg_path: String, frame_rate: String, frame_pattern: String) -> Self {
        Self {
            ffmpeg_path,
            frame_rate,
            frame_pattern,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(
            config.ffmpeg_path.clone(),
            config.frame_rate.clone(),
            config.frame_pattern.clone(),
        )
    }

    fn build_args(&self, input: &Path, output_dir: &Path) -> Vec<String> {
        vec![
            "-i".to_string(),
            input.to_string_lossy().to_string(),
            "-f".to_string(),
            "image2".to_string(),
            "-r".to_string(),
            self.frame_rate.clone(),
            output_dir
                .join(&self.frame_pattern)
                .to_string_lossy()
                .to_string(),
        ]
    }
}

#[async_trait]
impl FrameExtractor for FFmpegFrameExtractor {
    #[tracing::instrument(
        skip(self, input, output_dir),
        fields(input = %input.display(), output_dir = %output_dir.display())
    )]
    async fn extract(&self, input: &Path, output_dir: &Path) -> Result<()> {
        tokio::fs::create_dir_all(output_dir)
            .await
            .with_context(|| format!("Failed to create frame directory {}", output_dir.display()))?;

        let start = std::time::Instant::now();
        let output = Command::new(&self.ffmpeg_path)
            .args(self.build_args(input, output_dir))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .context("Failed to execute ffmpeg")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("FFmpeg failed ({}): {}", output.status, stderr.trim()));
        }

        tracing::debug!(
            stdout = %String::from_utf8_lossy(&output.stdout),
            "ffmpeg command output"
        );
        tracing::info!(
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Frames extracted"
        );

        Ok(())
    }
}
