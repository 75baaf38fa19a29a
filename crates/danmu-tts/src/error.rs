//! Speech pipeline error types.

use std::path::PathBuf;

use danmu_core::WeightKind;

/// Errors from a synthesis call. The worker logs these and drops the item.
#[derive(Debug, thiserror::Error)]
pub enum SynthesisError {
    /// No voice has been activated yet.
    #[error("No active voice - scan and switch weights first")]
    NoActiveVoice,

    /// The synthesis server answered with a non-success status.
    #[error("Synthesis server returned {status}: {message}")]
    Server { status: u16, message: String },

    /// The request could not be sent or the response not read.
    #[error("Synthesis request failed: {0}")]
    Request(String),

    /// The backend variant cannot synthesize.
    #[error("{0} backend is not implemented")]
    Unsupported(&'static str),
}

/// Errors from a two-phase weight switch. The active voice is unchanged.
#[derive(Debug, thiserror::Error)]
pub enum SwitchError {
    /// The name is not in the registry.
    #[error("Unknown voice '{0}'")]
    UnknownVoice(String),

    /// The server rejected one phase of the switch.
    #[error("Failed to set {kind} weights: server returned {status}: {message}")]
    Rejected {
        kind: WeightKind,
        status: u16,
        message: String,
    },

    /// One phase of the switch could not be sent.
    #[error("Failed to set {kind} weights: {reason}")]
    Request { kind: WeightKind, reason: String },
}

/// Errors from scanning the weight directories.
///
/// Only `NoVoices` is returned from `VoiceRegistry::scan`; the other variants
/// describe why a single candidate was skipped.
#[derive(Debug, thiserror::Error)]
pub enum VoiceScanError {
    /// No GPT weight file had both a SoVITS partner and reference audio.
    #[error("No usable GPT-SoVITS voices found in {}", gpt_dir.display())]
    NoVoices { gpt_dir: PathBuf },

    /// The GPT weight file name has no `-` separated suffix to strip.
    #[error("Cannot derive a voice name from '{0}'")]
    InvalidWeightName(String),

    /// No SoVITS weight file starts with the voice name.
    #[error("No SoVITS weights found for '{name}'")]
    MissingSovits { name: String },

    /// No `.wav` file under the voice's reference folder.
    #[error("No reference audio for '{name}' under {}", dir.display())]
    MissingReferenceAudio { name: String, dir: PathBuf },
}

/// Errors from the playback sink. The current item is lost.
#[derive(Debug, thiserror::Error)]
pub enum PlaybackError {
    /// No output device could be opened.
    #[error("Failed to open audio output: {0}")]
    OutputUnavailable(String),

    /// The payload is not decodable audio.
    #[error("Unsupported or corrupt audio: {0}")]
    Decode(String),

    /// The audio thread has exited.
    #[error("Audio thread is not running")]
    AudioThreadDied,
}
