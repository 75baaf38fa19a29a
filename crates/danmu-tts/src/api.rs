//! Client for the GPT-SoVITS HTTP API.
//!
//! Two calls are needed: `POST /tts` for synthesis and
//! `GET /set_{gpt,sovits}_weights?weights_path=...` for switching weights.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use danmu_core::{ActiveVoice, WeightKind};

use crate::error::{SwitchError, SynthesisError};

/// Synthesis can take a while for long messages on a busy GPU.
const SYNTHESIS_TIMEOUT: Duration = Duration::from_secs(120);
const SWITCH_TIMEOUT: Duration = Duration::from_secs(60);

/// Body of `POST /tts`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SynthesisRequest {
    pub text: String,
    pub text_lang: String,
    pub ref_audio_path: String,
    pub prompt_text: String,
    pub prompt_lang: String,
    pub text_split_method: String,
    pub media_type: String,
    pub streaming_mode: bool,
}

impl SynthesisRequest {
    /// Build a non-streaming WAV request voiced by `voice`.
    pub fn new(text: &str, text_lang: &str, voice: &ActiveVoice, prompt_lang: &str) -> Self {
        Self {
            text: text.to_string(),
            text_lang: text_lang.to_string(),
            ref_audio_path: voice.reference_audio_path.to_string_lossy().into_owned(),
            prompt_text: voice.prompt_text.clone(),
            prompt_lang: prompt_lang.to_string(),
            text_split_method: "cut5".to_string(),
            media_type: "wav".to_string(),
            streaming_mode: false,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    message: Option<String>,
}

/// The two GPT-SoVITS operations the pipeline depends on.
#[async_trait]
pub trait SovitsApi: Send + Sync {
    /// Synthesize `request` and return the audio bytes.
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<Bytes, SynthesisError>;

    /// Load one weight file on the server.
    async fn set_weights(&self, kind: WeightKind, path: &Path) -> Result<(), SwitchError>;
}

/// [`SovitsApi`] over HTTP with `reqwest`.
#[derive(Debug, Clone)]
pub struct ReqwestSovitsApi {
    client: reqwest::Client,
    base_url: Url,
}

impl ReqwestSovitsApi {
    pub fn new(base_url: &str) -> Result<Self, url::ParseError> {
        Ok(Self {
            client: reqwest::Client::new(),
            base_url: Url::parse(base_url)?,
        })
    }

    /// Append `segment` to the base URL path, keeping any path prefix.
    fn endpoint(&self, segment: &str) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(segment);
        }
        url
    }
}

/// Prefer the server's JSON `message`, fall back to the raw body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<ApiMessage>(body)
        .ok()
        .and_then(|m| m.message)
        .unwrap_or_else(|| body.trim().to_string())
}

#[async_trait]
impl SovitsApi for ReqwestSovitsApi {
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<Bytes, SynthesisError> {
        let url = self.endpoint("tts");
        debug!(%url, text_lang = %request.text_lang, chars = request.text.chars().count(), "Requesting synthesis");

        let response = self
            .client
            .post(url)
            .timeout(SYNTHESIS_TIMEOUT)
            .json(request)
            .send()
            .await
            .map_err(|e| SynthesisError::Request(e.to_string()))?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(SynthesisError::Server {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        response
            .bytes()
            .await
            .map_err(|e| SynthesisError::Request(e.to_string()))
    }

    async fn set_weights(&self, kind: WeightKind, path: &Path) -> Result<(), SwitchError> {
        let mut url = self.endpoint(kind.switch_endpoint());
        url.query_pairs_mut()
            .append_pair("weights_path", &path.to_string_lossy());
        debug!(%url, %kind, "Switching weights");

        let response = self
            .client
            .get(url)
            .timeout(SWITCH_TIMEOUT)
            .send()
            .await
            .map_err(|e| SwitchError::Request {
                kind,
                reason: e.to_string(),
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| SwitchError::Request {
            kind,
            reason: e.to_string(),
        })?;

        let message = error_message(&body);
        if status == reqwest::StatusCode::OK && message == "success" {
            Ok(())
        } else {
            Err(SwitchError::Rejected {
                kind,
                status: status.as_u16(),
                message,
            })
        }
    }
}

#[cfg(test)]
pub mod testing {
    //! In-memory [`SovitsApi`] that records every call.

    use std::collections::HashSet;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use std::time::Duration;

    use super::*;

    #[derive(Default)]
    pub struct FakeSovitsApi {
        pub synth_requests: Mutex<Vec<SynthesisRequest>>,
        pub switch_calls: Mutex<Vec<(WeightKind, PathBuf)>>,
        /// Weight kinds whose switch call is rejected.
        pub reject_kinds: Mutex<HashSet<WeightKind>>,
        /// Texts whose synthesis fails.
        pub failing_texts: Mutex<HashSet<String>>,
        /// How long each synthesis takes on the tokio clock.
        pub synth_delay: Duration,
    }

    impl FakeSovitsApi {
        pub fn rejecting(kind: WeightKind) -> Self {
            let api = Self::default();
            api.reject_kinds.lock().unwrap().insert(kind);
            api
        }

        pub fn with_synth_delay(delay: Duration) -> Self {
            Self {
                synth_delay: delay,
                ..Self::default()
            }
        }

        pub fn switch_calls(&self) -> Vec<(WeightKind, PathBuf)> {
            self.switch_calls.lock().unwrap().clone()
        }

        pub fn synthesized_texts(&self) -> Vec<String> {
            self.synth_requests
                .lock()
                .unwrap()
                .iter()
                .map(|r| r.text.clone())
                .collect()
        }
    }

    #[async_trait]
    impl SovitsApi for FakeSovitsApi {
        async fn synthesize(&self, request: &SynthesisRequest) -> Result<Bytes, SynthesisError> {
            self.synth_requests.lock().unwrap().push(request.clone());
            if !self.synth_delay.is_zero() {
                tokio::time::sleep(self.synth_delay).await;
            }
            if self.failing_texts.lock().unwrap().contains(&request.text) {
                return Err(SynthesisError::Server {
                    status: 400,
                    message: "bad text".to_string(),
                });
            }
            Ok(Bytes::from(format!("wav:{}", request.text)))
        }

        async fn set_weights(&self, kind: WeightKind, path: &Path) -> Result<(), SwitchError> {
            self.switch_calls
                .lock()
                .unwrap()
                .push((kind, path.to_path_buf()));
            if self.reject_kinds.lock().unwrap().contains(&kind) {
                return Err(SwitchError::Rejected {
                    kind,
                    status: 400,
                    message: "weights not found".to_string(),
                });
            }
            Ok(())
        }
    }
}
