#![doc = include_str!("../README.md")]
#![deny(unused_crate_dependencies)]

pub mod decode;
pub mod domain;
pub mod events;
pub mod ports;
pub mod settings;

// Re-export commonly used types for convenience
pub use decode::{DANMU_EVENT_TYPE, DecodeError, decode_frame};
pub use domain::{
    ActiveVoice, ChatEvent, ChatMessage, ConnectionState, ModelVersion, UnknownModelVersion,
    VoicePair, WeightKind,
};
pub use events::AppEvent;
pub use ports::{AppEventEmitter, ChannelEmitter, ChatListener, NoopEmitter};
pub use settings::{
    DEFAULT_GATEWAY_URL, DEFAULT_MAX_QUEUE_SIZE, DEFAULT_TTS_API_URL, GatewaySettings, Settings,
    SettingsError, SovitsSettings, SpeechSettings, validate_settings,
};
