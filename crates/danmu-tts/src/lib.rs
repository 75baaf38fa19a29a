#![doc = include_str!("../README.md")]
#![deny(unused_crate_dependencies)]

pub mod api;
pub mod backend;
mod error;
mod feeder;
pub mod language;
pub mod playback;
mod queue;
mod registry;
mod worker;

pub use api::{ReqwestSovitsApi, SovitsApi, SynthesisRequest};
pub use backend::{BackendKind, EdgeBackend, GptSovitsBackend, SpeechBackend};
pub use error::{PlaybackError, SwitchError, SynthesisError, VoiceScanError};
pub use feeder::SpeechFeeder;
pub use playback::{
    PlaybackCompletion, PlaybackSignal, PlaybackSink, RodioPlayback, completion_pair,
};
pub use queue::{QueuedSpeech, SpeechQueue};
pub use registry::{ScanSummary, VoiceRegistry, WeightsLayout, voice_name};
pub use worker::{DEFAULT_IDLE_POLL, DEFAULT_WORKER_STOP_GRACE, SynthesisWorker, WorkerConfig};
