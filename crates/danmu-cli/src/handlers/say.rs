//! `danmu say`: speak a few texts through the normal worker path and exit.

use anyhow::{Context, Result};
use tracing::warn;

use danmu_tts::{BackendKind, SpeechQueue};

use crate::bootstrap::CliContext;
use crate::error::CliError;
use crate::handlers::switch_error;

pub async fn execute(
    ctx: &CliContext,
    text: Vec<String>,
    voice: Option<String>,
    engine: BackendKind,
) -> Result<()> {
    let texts: Vec<String> = text
        .into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();
    if texts.is_empty() {
        return Err(CliError::Arguments("nothing to say".to_string()).into());
    }

    if engine == BackendKind::GptSovits {
        let registry = ctx.registry();
        let summary = registry
            .scan()
            .await
            .map_err(|e| CliError::Runtime(e.to_string()))?;
        match voice {
            Some(name) => {
                registry.switch_weights(&name).await.map_err(switch_error)?;
            }
            None => {
                summary.activation.map_err(switch_error)?;
            }
        }
    }

    // Sized to hold every text so none is dropped.
    let queue = SpeechQueue::new(texts.len());
    for text in texts {
        queue.enqueue(text);
    }

    let worker = ctx.worker(queue.clone(), engine)?;
    worker.start().await;
    tokio::select! {
        () = queue.drain() => {}
        signal = tokio::signal::ctrl_c() => {
            signal.context("failed to listen for Ctrl-C")?;
            warn!(remaining = queue.len(), "Interrupted");
        }
    }
    worker.stop().await;
    Ok(())
}
