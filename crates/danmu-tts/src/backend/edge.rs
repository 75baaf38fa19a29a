//! Edge TTS placeholder.
//!
//! Selectable so the engine switch is exercised end to end, but there is no
//! synthesis behind it yet.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::warn;

use super::SpeechBackend;
use crate::error::SynthesisError;

/// Simulated latency before the placeholder fails.
pub const EDGE_PLACEHOLDER_DELAY: Duration = Duration::from_secs(3);

#[derive(Debug, Clone)]
pub struct EdgeBackend {
    delay: Duration,
}

impl EdgeBackend {
    pub const fn new() -> Self {
        Self {
            delay: EDGE_PLACEHOLDER_DELAY,
        }
    }

    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

impl Default for EdgeBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SpeechBackend for EdgeBackend {
    fn name(&self) -> &'static str {
        "edge"
    }

    async fn is_ready(&self) -> bool {
        true
    }

    async fn generate_audio(&self, text: &str) -> Result<Bytes, SynthesisError> {
        tokio::time::sleep(self.delay).await;
        warn!(chars = text.chars().count(), "Edge backend cannot synthesize");
        Err(SynthesisError::Unsupported("Edge"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_placeholder_fails_after_delay() {
        let backend = EdgeBackend::new();
        assert!(backend.is_ready().await);

        let started = tokio::time::Instant::now();
        let err = backend.generate_audio("hi").await.unwrap_err();
        assert!(matches!(err, SynthesisError::Unsupported("Edge")));
        assert_eq!(started.elapsed(), EDGE_PLACEHOLDER_DELAY);
    }
}
