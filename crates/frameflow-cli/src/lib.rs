use anyhow::{Context, Result};
use frameflow_core::{ObjectRef, StorageEvent};
use frameflow_processing::{BatchUploadSummary, MediaPipelineOrchestrator};
use std::io::Read;
use std::path::Path;

/// Initialize tracing for the frameflow binary.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("frameflow=info,info")),
        )
        .init();
}

/// What a single invocation processes.
#[derive(Debug, Clone)]
pub enum Trigger {
    /// An object-created notification; keys are still encoded.
    Event(StorageEvent),
    /// An explicit bucket and already-decoded key.
    Object(ObjectRef),
}

impl Trigger {
    pub async fn run(
        &self,
        orchestrator: &MediaPipelineOrchestrator,
    ) -> Result<Vec<BatchUploadSummary>> {
        match self {
            Trigger::Event(event) => orchestrator.handle_event(event).await,
            Trigger::Object(object) => Ok(vec![orchestrator.process_object(object).await?]),
        }
    }
}

/// Read a notification from a file, or from stdin when `source` is `-`.
pub fn read_event(source: &Path) -> Result<StorageEvent> {
    let data = if source == Path::new("-") {
        let mut data = String::new();
        std::io::stdin()
            .read_to_string(&mut data)
            .context("Failed to read notification from stdin")?;
        data
    } else {
        std::fs::read_to_string(source)
            .with_context(|| format!("Failed to read notification {}", source.display()))?
    };

    StorageEvent::from_json(&data).context("Failed to parse notification")
}
