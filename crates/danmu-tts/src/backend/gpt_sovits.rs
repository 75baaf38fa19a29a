//! GPT-SoVITS backend.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;

use danmu_core::SovitsSettings;

use super::SpeechBackend;
use crate::api::{SovitsApi, SynthesisRequest};
use crate::error::SynthesisError;
use crate::language::target_language;
use crate::registry::VoiceRegistry;

/// Synthesizes with whichever voice the registry has active.
pub struct GptSovitsBackend {
    api: Arc<dyn SovitsApi>,
    registry: Arc<VoiceRegistry>,
    prompt_lang: String,
    target_lang: String,
}

impl GptSovitsBackend {
    pub fn new(
        api: Arc<dyn SovitsApi>,
        registry: Arc<VoiceRegistry>,
        prompt_lang: impl Into<String>,
        target_lang: impl Into<String>,
    ) -> Self {
        Self {
            api,
            registry,
            prompt_lang: prompt_lang.into(),
            target_lang: target_lang.into(),
        }
    }

    pub fn from_settings(
        api: Arc<dyn SovitsApi>,
        registry: Arc<VoiceRegistry>,
        settings: &SovitsSettings,
    ) -> Self {
        Self::new(api, registry, &settings.prompt_lang, &settings.target_lang)
    }
}

#[async_trait]
impl SpeechBackend for GptSovitsBackend {
    fn name(&self) -> &'static str {
        "gpt-sovits"
    }

    async fn is_ready(&self) -> bool {
        self.registry.read_active().await.is_some()
    }

    async fn generate_audio(&self, text: &str) -> Result<Bytes, SynthesisError> {
        // Held for the whole request so a switch cannot land mid-synthesis.
        let active = self.registry.read_active().await;
        let voice = active.as_ref().ok_or(SynthesisError::NoActiveVoice)?;

        let text_lang = target_language(text, &self.target_lang);
        debug!(voice = %voice.name, text_lang, "Synthesizing");

        let request = SynthesisRequest::new(text, text_lang, voice, &self.prompt_lang);
        self.api.synthesize(&request).await
    }
}
