//! Voice model types for the GPT-SoVITS backend.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Reference clips are named `<tag><transcript>.wav` where the tag is a
/// fixed five-character emotion marker; the transcript is the prompt text.
const PROMPT_TAG_CHARS: usize = 5;

/// GPT-SoVITS architecture version. Selects which weight directories are scanned.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelVersion {
    #[serde(rename = "v1")]
    V1,
    #[default]
    #[serde(rename = "v2")]
    V2,
    #[serde(rename = "v2Pro")]
    V2Pro,
    #[serde(rename = "v2ProPlus")]
    V2ProPlus,
    #[serde(rename = "v3")]
    V3,
    #[serde(rename = "v4")]
    V4,
}

impl ModelVersion {
    pub const ALL: [Self; 6] = [
        Self::V1,
        Self::V2,
        Self::V2Pro,
        Self::V2ProPlus,
        Self::V3,
        Self::V4,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::V1 => "v1",
            Self::V2 => "v2",
            Self::V2Pro => "v2Pro",
            Self::V2ProPlus => "v2ProPlus",
            Self::V3 => "v3",
            Self::V4 => "v4",
        }
    }

    /// Directory holding the given weight kind, relative to the GPT-SoVITS root.
    ///
    /// `v1` predates versioned directories and uses the bare names.
    pub fn weights_dir(self, kind: WeightKind) -> String {
        match self {
            Self::V1 => kind.dir_prefix().to_string(),
            other => format!("{}_{}", kind.dir_prefix(), other.as_str()),
        }
    }
}

impl fmt::Display for ModelVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown model version string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown model version '{0}' (expected one of v1, v2, v2Pro, v2ProPlus, v3, v4)")]
pub struct UnknownModelVersion(pub String);

impl FromStr for ModelVersion {
    type Err = UnknownModelVersion;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|v| v.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownModelVersion(s.to_string()))
    }
}

/// The two weight files that make up a voice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeightKind {
    Gpt,
    Sovits,
}

impl WeightKind {
    const fn dir_prefix(self) -> &'static str {
        match self {
            Self::Gpt => "GPT_weights",
            Self::Sovits => "SoVITS_weights",
        }
    }

    /// File extension used by this kind of weight file.
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Gpt => "ckpt",
            Self::Sovits => "pth",
        }
    }

    /// Remote endpoint that activates this kind of weight.
    pub const fn switch_endpoint(self) -> &'static str {
        match self {
            Self::Gpt => "set_gpt_weights",
            Self::Sovits => "set_sovits_weights",
        }
    }
}

impl fmt::Display for WeightKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gpt => f.write_str("GPT"),
            Self::Sovits => f.write_str("SoVITS"),
        }
    }
}

/// A matched GPT + SoVITS weight pair with its reference clip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoicePair {
    pub name: String,
    pub gpt_weight_path: PathBuf,
    pub sovits_weight_path: PathBuf,
    pub reference_audio_path: PathBuf,
}

impl VoicePair {
    pub fn weight_path(&self, kind: WeightKind) -> &Path {
        match kind {
            WeightKind::Gpt => &self.gpt_weight_path,
            WeightKind::Sovits => &self.sovits_weight_path,
        }
    }
}

/// The voice currently loaded on the synthesis server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveVoice {
    pub name: String,
    pub version: ModelVersion,
    pub reference_audio_path: PathBuf,
    /// Transcript of the reference clip, derived from its file name.
    pub prompt_text: String,
}

impl ActiveVoice {
    pub fn from_pair(pair: &VoicePair, version: ModelVersion) -> Self {
        Self {
            name: pair.name.clone(),
            version,
            reference_audio_path: pair.reference_audio_path.clone(),
            prompt_text: prompt_text_for(&pair.reference_audio_path),
        }
    }
}

/// Derive the prompt transcript from a reference clip path.
///
/// Drops the five-character tag from the file stem. Stems shorter than the
/// tag yield an empty prompt.
pub fn prompt_text_for(reference_audio: &Path) -> String {
    reference_audio
        .file_stem()
        .map(|stem| {
            stem.to_string_lossy()
                .chars()
                .skip(PROMPT_TAG_CHARS)
                .collect()
        })
        .unwrap_or_default()
}
