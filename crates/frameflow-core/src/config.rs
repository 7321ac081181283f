//! Configuration module
//!
//! This module provides the pipeline configuration: storage backend selection,
//! frame extraction settings, working directory layout and upload limits.

use std::env;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::storage_types::StorageBackend;

const FFMPEG_PATH: &str = "ffmpeg";
const FRAME_RATE: &str = "1/2";
const FRAME_PATTERN: &str = "output_%04d.jpg";
const OUTPUT_SUFFIX: &str = "-out";

/// What the directory walk does with entries it cannot read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WalkErrorPolicy {
    /// Skip unreadable entries without reporting them.
    #[default]
    Ignore,
    /// Skip unreadable entries but keep them on the enumeration result.
    Collect,
    /// Stop at the first unreadable entry and fail the batch.
    Abort,
}

impl FromStr for WalkErrorPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ignore" => Ok(WalkErrorPolicy::Ignore),
            "collect" => Ok(WalkErrorPolicy::Collect),
            "abort" => Ok(WalkErrorPolicy::Abort),
            _ => Err(anyhow::anyhow!("Invalid walk error policy: {}", s)),
        }
    }
}

impl Display for WalkErrorPolicy {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            WalkErrorPolicy::Ignore => write!(f, "ignore"),
            WalkErrorPolicy::Collect => write!(f, "collect"),
            WalkErrorPolicy::Abort => write!(f, "abort"),
        }
    }
}

/// Pipeline configuration
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    // Storage configuration
    pub storage_backend: StorageBackend,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>, // Custom endpoint for S3-compatible providers (MinIO, etc.)
    pub local_storage_path: Option<PathBuf>,
    // Frame extraction
    pub ffmpeg_path: String,
    pub frame_rate: String,
    pub frame_pattern: String,
    // Working directory layout
    pub work_dir: PathBuf,
    pub output_suffix: String,
    pub cleanup_work_files: bool,
    // Upload behavior
    pub walk_error_policy: WalkErrorPolicy,
    pub upload_timeout: Option<Duration>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            storage_backend: StorageBackend::S3,
            s3_region: None,
            s3_endpoint: None,
            local_storage_path: None,
            ffmpeg_path: FFMPEG_PATH.to_string(),
            frame_rate: FRAME_RATE.to_string(),
            frame_pattern: FRAME_PATTERN.to_string(),
            work_dir: env::temp_dir(),
            output_suffix: OUTPUT_SUFFIX.to_string(),
            cleanup_work_files: true,
            walk_error_policy: WalkErrorPolicy::Ignore,
            upload_timeout: None,
        }
    }
}

impl PipelineConfig {
    /// Load configuration from the process environment (and `.env` if present).
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let storage_backend = match var("STORAGE_BACKEND") {
            Some(value) => value.parse()?,
            None => defaults.storage_backend,
        };

        let walk_error_policy = match var("WALK_ERROR_POLICY") {
            Some(value) => value.parse()?,
            None => defaults.walk_error_policy,
        };

        let upload_timeout = match var("UPLOAD_TIMEOUT_SECS") {
            Some(value) => Some(Duration::from_secs(value.trim().parse::<u64>().map_err(
                |e| anyhow::anyhow!("UPLOAD_TIMEOUT_SECS must be a number of seconds: {}", e),
            )?)),
            None => None,
        };

        let cleanup_work_files = var("CLEANUP_WORK_FILES")
            .map(|v| v.trim().eq_ignore_ascii_case("true") || v.trim() == "1")
            .unwrap_or(defaults.cleanup_work_files);

        let config = Self {
            storage_backend,
            s3_region: var("S3_REGION").or_else(|| var("AWS_REGION")),
            s3_endpoint: var("S3_ENDPOINT"),
            local_storage_path: var("LOCAL_STORAGE_PATH").map(PathBuf::from),
            ffmpeg_path: var("FFMPEG_PATH").unwrap_or(defaults.ffmpeg_path),
            frame_rate: var("FRAME_RATE").unwrap_or(defaults.frame_rate),
            frame_pattern: var("FRAME_PATTERN").unwrap_or(defaults.frame_pattern),
            work_dir: var("WORK_DIR").map(PathBuf::from).unwrap_or(defaults.work_dir),
            output_suffix: lookup("OUTPUT_SUFFIX").unwrap_or(defaults.output_suffix),
            cleanup_work_files,
            walk_error_policy,
            upload_timeout,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.ffmpeg_path.trim().is_empty() {
            return Err(anyhow::anyhow!("FFMPEG_PATH cannot be empty"));
        }
        if self.frame_pattern.trim().is_empty() {
            return Err(anyhow::anyhow!("FRAME_PATTERN cannot be empty"));
        }
        if self.frame_pattern.contains('/') {
            return Err(anyhow::anyhow!(
                "FRAME_PATTERN must be a file name, not a path: {}",
                self.frame_pattern
            ));
        }
        if self.output_suffix.is_empty() || self.output_suffix.contains('/') {
            return Err(anyhow::anyhow!(
                "OUTPUT_SUFFIX must be non-empty and must not contain '/': {:?}",
                self.output_suffix
            ));
        }
        if self.upload_timeout == Some(Duration::ZERO) {
            return Err(anyhow::anyhow!("UPLOAD_TIMEOUT_SECS must be greater than 0"));
        }
        if self.storage_backend == StorageBackend::Local && self.local_storage_path.is_none() {
            return Err(anyhow::anyhow!(
                "LOCAL_STORAGE_PATH is required when STORAGE_BACKEND=local"
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<PipelineConfig, anyhow::Error> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        PipelineConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_match_lambda_layout() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.storage_backend, StorageBackend::S3);
        assert_eq!(config.ffmpeg_path, "ffmpeg");
        assert_eq!(config.frame_rate, "1/2");
        assert_eq!(config.frame_pattern, "output_%04d.jpg");
        assert_eq!(config.output_suffix, "-out");
        assert_eq!(config.walk_error_policy, WalkErrorPolicy::Ignore);
        assert!(config.upload_timeout.is_none());
        assert!(config.cleanup_work_files);
    }

    #[test]
    fn reads_overrides() {
        let config = config_from(&[
            ("STORAGE_BACKEND", "local"),
            ("LOCAL_STORAGE_PATH", "/srv/objects"),
            ("WALK_ERROR_POLICY", "Abort"),
            ("UPLOAD_TIMEOUT_SECS", "30"),
            ("CLEANUP_WORK_FILES", "false"),
            ("AWS_REGION", "eu-west-1"),
        ])
        .unwrap();

        assert_eq!(config.storage_backend, StorageBackend::Local);
        assert_eq!(
            config.local_storage_path.as_deref(),
            Some(std::path::Path::new("/srv/objects"))
        );
        assert_eq!(config.walk_error_policy, WalkErrorPolicy::Abort);
        assert_eq!(config.upload_timeout, Some(Duration::from_secs(30)));
        assert!(!config.cleanup_work_files);
        assert_eq!(config.s3_region.as_deref(), Some("eu-west-1"));
    }

    #[test]
    fn s3_region_wins_over_aws_region() {
        let config =
            config_from(&[("S3_REGION", "us-east-2"), ("AWS_REGION", "eu-west-1")]).unwrap();
        assert_eq!(config.s3_region.as_deref(), Some("us-east-2"));
    }

    #[test]
    fn local_backend_requires_path() {
        assert!(config_from(&[("STORAGE_BACKEND", "local")]).is_err());
    }

    #[test]
    fn rejects_bad_values() {
        assert!(config_from(&[("WALK_ERROR_POLICY", "retry")]).is_err());
        assert!(config_from(&[("UPLOAD_TIMEOUT_SECS", "soon")]).is_err());
        assert!(config_from(&[("UPLOAD_TIMEOUT_SECS", "0")]).is_err());
        assert!(config_from(&[("FRAME_PATTERN", "frames/out_%04d.jpg")]).is_err());
    }

    #[test]
    fn output_suffix_must_name_a_sibling() {
        assert!(config_from(&[("OUTPUT_SUFFIX", "")]).is_err());
        assert!(config_from(&[("OUTPUT_SUFFIX", "/frames")]).is_err());
        let config = config_from(&[("OUTPUT_SUFFIX", "-frames")]).unwrap();
        assert_eq!(config.output_suffix, "-frames");
    }
}
