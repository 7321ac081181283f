//! frameflow: extract still frames from a stored video and upload them.
//!
//! Configuration comes from the environment (see `PipelineConfig`). The
//! process exits 0 when every object was processed and 1 otherwise.

use anyhow::Context;
use clap::Parser;
use frameflow_cli::{init_tracing, read_event, Trigger};
use frameflow_core::{ObjectRef, PipelineConfig};
use frameflow_processing::{FFmpegFrameExtractor, MediaPipelineOrchestrator, OrchestratorConfig};
use frameflow_storage::create_storage;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "frameflow", about = "Extract video frames into object storage")]
struct Cli {
    /// Object-created notification (JSON file, or `-` for stdin)
    #[arg(long, conflicts_with_all = ["bucket", "key"], required_unless_present = "key")]
    event: Option<PathBuf>,
    /// Source bucket
    #[arg(long, requires = "key")]
    bucket: Option<String>,
    /// Source object key, already decoded
    #[arg(long, requires = "bucket")]
    key: Option<String>,
}

impl Cli {
    fn trigger(self) -> anyhow::Result<Trigger> {
        match (self.event, self.bucket, self.key) {
            (Some(source), _, _) => Ok(Trigger::Event(read_event(&source)?)),
            (None, Some(bucket), Some(key)) => Ok(Trigger::Object(ObjectRef { bucket, key })),
            _ => Err(anyhow::anyhow!("Either --event or --bucket and --key is required")),
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = PipelineConfig::from_env().context("Invalid configuration")?;
    let trigger = cli.trigger()?;

    let storage = create_storage(&config)
        .await
        .context("Failed to initialize storage")?;
    let extractor = Arc::new(FFmpegFrameExtractor::from_config(&config));

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, cancelling upload");
            on_signal.cancel();
        }
    });

    let orchestrator =
        MediaPipelineOrchestrator::new(storage, extractor, OrchestratorConfig::from(&config))
            .with_cancellation(cancel);

    let summaries = trigger.run(&orchestrator).await?;

    tracing::info!(
        objects = summaries.len(),
        frames = summaries.iter().map(|s| s.uploaded).sum::<usize>(),
        "All objects processed"
    );
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %format!("{:#}", e), "frameflow failed");
            ExitCode::FAILURE
        }
    }
}
