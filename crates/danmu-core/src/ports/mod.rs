//! Port definitions: the seams adapters plug into.

mod chat;
mod event_emitter;

pub use chat::ChatListener;
pub use event_emitter::{AppEventEmitter, ChannelEmitter, NoopEmitter};
