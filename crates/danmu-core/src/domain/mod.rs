//! Domain types shared by the gateway, the speech pipeline and the CLI.

mod chat;
mod connection;
mod voice;

pub use chat::{ChatEvent, ChatMessage};
pub use connection::ConnectionState;
pub use voice::{
    ActiveVoice, ModelVersion, UnknownModelVersion, VoicePair, WeightKind, prompt_text_for,
};
