//! Canonical event union for everything the gateway and speech pipeline report.
//!
//! # Wire Format
//!
//! Events are serialized with a `type` tag so a future UI bridge can forward
//! them unchanged:
//!
//! ```json
//! { "type": "connection_status", "status": "retrying" }
//! ```

use serde::{Deserialize, Serialize};

use crate::domain::{ChatEvent, ConnectionState, ModelVersion};

/// Application events published through [`crate::ports::AppEventEmitter`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppEvent {
    // ========== Gateway Events ==========
    /// The gateway connection changed state.
    ConnectionStatus {
        /// New state; serializes to the status string.
        status: ConnectionState,
    },

    /// A DANMU chat event was received and decoded.
    ChatReceived {
        /// The decoded event.
        event: ChatEvent,
    },

    // ========== Speech Queue Events ==========
    /// The speech queue was full and dropped its oldest item.
    SpeechDropped {
        /// Text that was evicted.
        text: String,
    },

    /// The worker started synthesizing an item.
    SpeechStarted {
        /// Text being synthesized.
        text: String,
    },

    /// Playback of an item finished.
    SpeechFinished {
        /// Text that was spoken.
        text: String,
    },

    /// The synthesis request for an item failed; the item was dropped.
    SynthesisFailed {
        /// Text that could not be synthesized.
        text: String,
        /// Error description.
        error: String,
    },

    /// The playback sink rejected the audio for an item.
    PlaybackFailed {
        /// Text whose audio was lost.
        text: String,
        /// Error description.
        error: String,
    },

    // ========== Voice Events ==========
    /// A registry scan completed.
    VoicesScanned {
        /// Names of all discovered voices, in discovery order.
        names: Vec<String>,
    },

    /// A voice was activated on the synthesis server.
    VoiceActivated {
        /// Name of the voice.
        name: String,
        /// Architecture version it was activated for.
        version: ModelVersion,
    },

    /// A voice switch failed. The previous voice stays active.
    VoiceSwitchFailed {
        /// Name of the voice that was requested.
        name: String,
        /// Error description.
        error: String,
    },
}

impl AppEvent {
    /// Stable name of the event, matching the serialized `type` tag.
    pub const fn event_name(&self) -> &'static str {
        match self {
            Self::ConnectionStatus { .. } => "connection_status",
            Self::ChatReceived { .. } => "chat_received",
            Self::SpeechDropped { .. } => "speech_dropped",
            Self::SpeechStarted { .. } => "speech_started",
            Self::SpeechFinished { .. } => "speech_finished",
            Self::SynthesisFailed { .. } => "synthesis_failed",
            Self::PlaybackFailed { .. } => "playback_failed",
            Self::VoicesScanned { .. } => "voices_scanned",
            Self::VoiceActivated { .. } => "voice_activated",
            Self::VoiceSwitchFailed { .. } => "voice_switch_failed",
        }
    }

    pub const fn connection_status(status: ConnectionState) -> Self {
        Self::ConnectionStatus { status }
    }
}
