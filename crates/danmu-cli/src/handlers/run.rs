//! `danmu run`: read live chat aloud until Ctrl-C.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, warn};

use danmu_tts::{BackendKind, SpeechFeeder, SpeechQueue};

use crate::bootstrap::CliContext;

pub async fn execute(ctx: &CliContext, drain_timeout: u64, engine: BackendKind) -> Result<()> {
    if engine == BackendKind::GptSovits {
        // Without a voice the worker idles until one is activated.
        match ctx.registry().scan().await {
            Ok(summary) => println!(
                "Found {} voice(s): {}",
                summary.voices.len(),
                summary.voices.join(", ")
            ),
            Err(e) => warn!(
                error = %e,
                "Voice scan failed; speech is paused until a voice is available"
            ),
        }
    }

    let queue = ctx.speech_queue();
    let worker = ctx.worker(queue.clone(), engine)?;
    let connection = ctx.connection();
    connection.add_listener(Arc::new(SpeechFeeder::new(queue.clone(), ctx.emitter())));

    worker.start().await;
    connection.start().await;
    println!(
        "Listening on {} for task(s) {} (Ctrl-C to stop)",
        connection.config().url,
        connection.config().task_ids.join(", ")
    );

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;
    info!("Shutting down");

    connection.stop().await;
    drain(&queue, Duration::from_secs(drain_timeout)).await;
    worker.stop().await;
    Ok(())
}

/// Let the worker finish queued speech, bounded by `timeout`.
async fn drain(queue: &SpeechQueue, timeout: Duration) {
    if timeout.is_zero() {
        return;
    }
    info!(pending = queue.len(), timeout_secs = timeout.as_secs(), "Draining speech queue");
    if tokio::time::timeout(timeout, queue.drain()).await.is_err() {
        warn!(remaining = queue.len(), "Speech queue did not drain in time");
    }
}
