//! Synthesis backends.
//!
//! The [`SynthesisWorker`](crate::worker::SynthesisWorker) holds an
//! `Arc<dyn SpeechBackend>` so the engine can be chosen at startup.
//!
//! | Backend | Module | Status |
//! |---------|--------|--------|
//! | GPT-SoVITS | [`gpt_sovits`] | HTTP API, voice from [`VoiceRegistry`](crate::registry::VoiceRegistry) |
//! | Edge | [`edge`] | Placeholder, always fails |

pub mod edge;
pub mod gpt_sovits;

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::SynthesisError;

pub use edge::EdgeBackend;
pub use gpt_sovits::GptSovitsBackend;

/// Backend-agnostic text-to-speech engine producing encoded audio.
#[async_trait]
pub trait SpeechBackend: Send + Sync {
    /// Short engine name for logs.
    fn name(&self) -> &'static str;

    /// Whether the backend can synthesize right now.
    ///
    /// The worker polls this before taking an item off the queue.
    async fn is_ready(&self) -> bool;

    /// Synthesize `text` into a complete audio file (WAV).
    async fn generate_audio(&self, text: &str) -> Result<Bytes, SynthesisError>;
}

/// Selectable backend kinds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BackendKind {
    #[default]
    GptSovits,
    Edge,
}

impl BackendKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::GptSovits => "gpt-sovits",
            Self::Edge => "edge",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "gpt-sovits" | "gpt_sovits" | "sovits" => Ok(Self::GptSovits),
            "edge" => Ok(Self::Edge),
            other => Err(format!("unknown backend '{other}' (expected gpt-sovits or edge)")),
        }
    }
}
