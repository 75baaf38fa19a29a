//! Application settings: the shape of `config.json`.
//!
//! Every field has a default, so a partial file (or none at all) yields a
//! usable configuration. Loading from disk is the CLI's job; this module owns
//! the types, the defaults and validation.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::domain::ModelVersion;

/// Default gateway WebSocket endpoint.
pub const DEFAULT_GATEWAY_URL: &str = "ws://localhost:9000";

/// Default GPT-SoVITS API endpoint.
pub const DEFAULT_TTS_API_URL: &str = "http://localhost:9001";

/// Default speech queue capacity.
pub const DEFAULT_MAX_QUEUE_SIZE: usize = 5;

/// Language codes the GPT-SoVITS API accepts for `text_lang` / `prompt_lang`.
pub const SUPPORTED_LANGUAGES: &[&str] = &["zh", "en", "jp", "ja", "yue", "ko", "auto"];

/// Top-level settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Chat gateway connection.
    #[serde(rename = "danmakuClient")]
    pub gateway: GatewaySettings,

    /// Speech queue and synthesis backend.
    #[serde(rename = "ttsClient")]
    pub speech: SpeechSettings,
}

/// Chat gateway connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewaySettings {
    /// RSocket-over-WebSocket endpoint.
    #[serde(rename = "rsocketUrl", alias = "rsocketUrL")]
    pub url: String,

    /// Gateway task ids to subscribe to.
    #[serde(rename = "taskIds")]
    pub task_ids: Vec<String>,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            url: DEFAULT_GATEWAY_URL.to_string(),
            task_ids: vec!["id".to_string()],
        }
    }
}

/// Speech pipeline settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechSettings {
    /// Capacity of the drop-oldest speech queue.
    #[serde(rename = "maxQueueSize")]
    pub max_queue_size: usize,

    /// GPT-SoVITS backend.
    #[serde(rename = "ai")]
    pub sovits: SovitsSettings,
}

impl Default for SpeechSettings {
    fn default() -> Self {
        Self {
            max_queue_size: DEFAULT_MAX_QUEUE_SIZE,
            sovits: SovitsSettings::default(),
        }
    }
}

/// GPT-SoVITS backend settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SovitsSettings {
    /// Base URL of the GPT-SoVITS API server.
    pub api_url: String,

    /// GPT-SoVITS install root containing the `GPT_weights*` / `SoVITS_weights*` dirs.
    #[serde(alias = "GPT-SoVitsRoot")]
    pub gpt_sovits_root: PathBuf,

    /// Root of the per-voice reference clip folders.
    pub ref_audio_root: PathBuf,

    /// Language of the reference clips.
    pub prompt_lang: String,

    /// Target language when the text contains no kana.
    pub target_lang: String,

    /// Model architecture version.
    pub version: ModelVersion,
}

impl Default for SovitsSettings {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_TTS_API_URL.to_string(),
            gpt_sovits_root: PathBuf::from("GPT-SoVITS"),
            ref_audio_root: PathBuf::from("reference_audio"),
            prompt_lang: "zh".to_string(),
            target_lang: "zh".to_string(),
            version: ModelVersion::default(),
        }
    }
}

/// Settings validation error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    #[error("Max queue size must be at least 1, got {0}")]
    InvalidQueueSize(usize),

    #[error("{field} is not a valid URL ({url}): {reason}")]
    InvalidUrl {
        field: &'static str,
        url: String,
        reason: String,
    },

    #[error("{field} must use {expected}, got '{scheme}'")]
    InvalidScheme {
        field: &'static str,
        expected: &'static str,
        scheme: String,
    },

    #[error("At least one gateway task id is required")]
    NoTaskIds,

    #[error("Unsupported {field} '{lang}'")]
    UnsupportedLanguage { field: &'static str, lang: String },

    #[error("{0} cannot be empty")]
    EmptyPath(&'static str),
}

/// Validate settings values.
pub fn validate_settings(settings: &Settings) -> Result<(), SettingsError> {
    // Validate gateway endpoint
    check_url(
        "gateway url",
        &settings.gateway.url,
        &["ws", "wss"],
        "ws:// or wss://",
    )?;

    if settings
        .gateway
        .task_ids
        .iter()
        .all(|id| id.trim().is_empty())
    {
        return Err(SettingsError::NoTaskIds);
    }

    // Validate speech queue size
    if settings.speech.max_queue_size == 0 {
        return Err(SettingsError::InvalidQueueSize(0));
    }

    let sovits = &settings.speech.sovits;
    check_url(
        "TTS api url",
        &sovits.api_url,
        &["http", "https"],
        "http:// or https://",
    )?;

    check_language("prompt language", &sovits.prompt_lang)?;
    check_language("target language", &sovits.target_lang)?;

    if sovits.gpt_sovits_root.as_os_str().is_empty() {
        return Err(SettingsError::EmptyPath("GPT-SoVITS root"));
    }
    if sovits.ref_audio_root.as_os_str().is_empty() {
        return Err(SettingsError::EmptyPath("reference audio root"));
    }

    Ok(())
}

fn check_url(
    field: &'static str,
    raw: &str,
    schemes: &[&str],
    expected: &'static str,
) -> Result<(), SettingsError> {
    let url = Url::parse(raw).map_err(|e| SettingsError::InvalidUrl {
        field,
        url: raw.to_string(),
        reason: e.to_string(),
    })?;
    if !schemes.contains(&url.scheme()) {
        return Err(SettingsError::InvalidScheme {
            field,
            expected,
            scheme: url.scheme().to_string(),
        });
    }
    Ok(())
}

fn check_language(field: &'static str, lang: &str) -> Result<(), SettingsError> {
    if SUPPORTED_LANGUAGES.contains(&lang) {
        Ok(())
    } else {
        Err(SettingsError::UnsupportedLanguage {
            field,
            lang: lang.to_string(),
        })
    }
}
