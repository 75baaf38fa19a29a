//! CLI bootstrap - the composition root.
//!
//! The only place where concrete adapters are chosen:
//! - `ReqwestSovitsApi` for the GPT-SoVITS server
//! - `RodioPlayback` for audio output
//! - `WsConnector` (via `ChannelConnection::new`) for the gateway
//!
//! Handlers receive a [`CliContext`] and never construct adapters themselves.

use std::sync::Arc;

use tracing::debug;

use danmu_core::{AppEventEmitter, Settings};
use danmu_gateway::{ChannelConnection, ConnectionConfig};
use danmu_tts::{
    BackendKind, EdgeBackend, GptSovitsBackend, ReqwestSovitsApi, RodioPlayback, SovitsApi,
    SpeechBackend, SpeechQueue, SynthesisWorker, VoiceRegistry, WeightsLayout,
};

use crate::error::CliError;
use crate::presentation::ConsoleEmitter;

/// Fully composed context for CLI commands.
pub struct CliContext {
    settings: Settings,
    emitter: Arc<dyn AppEventEmitter>,
    api: Arc<dyn SovitsApi>,
    registry: Arc<VoiceRegistry>,
}

impl CliContext {
    pub const fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn emitter(&self) -> Arc<dyn AppEventEmitter> {
        Arc::clone(&self.emitter)
    }

    pub fn registry(&self) -> &VoiceRegistry {
        &self.registry
    }

    /// The speech queue sized from the configuration.
    pub fn speech_queue(&self) -> SpeechQueue {
        SpeechQueue::new(self.settings.speech.max_queue_size)
    }

    pub fn backend(&self, kind: BackendKind) -> Arc<dyn SpeechBackend> {
        match kind {
            BackendKind::GptSovits => Arc::new(GptSovitsBackend::from_settings(
                Arc::clone(&self.api),
                Arc::clone(&self.registry),
                &self.settings.speech.sovits,
            )),
            BackendKind::Edge => Arc::new(EdgeBackend::new()),
        }
    }

    /// Open the audio device and build a worker over `queue`.
    pub fn worker(
        &self,
        queue: SpeechQueue,
        kind: BackendKind,
    ) -> Result<SynthesisWorker, CliError> {
        let sink = RodioPlayback::spawn().map_err(|e| CliError::Runtime(e.to_string()))?;
        Ok(SynthesisWorker::new(
            queue,
            self.backend(kind),
            Arc::new(sink),
            self.emitter(),
        ))
    }

    pub fn connection(&self) -> ChannelConnection {
        ChannelConnection::new(
            ConnectionConfig::from_settings(&self.settings.gateway),
            self.emitter(),
        )
    }
}

/// Build the context from validated settings.
pub fn bootstrap(settings: Settings) -> Result<CliContext, CliError> {
    let sovits = &settings.speech.sovits;
    let api = ReqwestSovitsApi::new(&sovits.api_url)
        .map_err(|e| CliError::Config(format!("invalid TTS api url '{}': {e}", sovits.api_url)))?;
    let api: Arc<dyn SovitsApi> = Arc::new(api);

    let emitter: Arc<dyn AppEventEmitter> = Arc::new(ConsoleEmitter);
    let registry = Arc::new(VoiceRegistry::new(
        WeightsLayout::from_settings(sovits),
        sovits.version,
        Arc::clone(&api),
        Arc::clone(&emitter),
    ));
    debug!(api_url = %sovits.api_url, version = %sovits.version, "CLI context ready");

    Ok(CliContext {
        settings,
        emitter,
        api,
        registry,
    })
}
