//! Bridges decoded chat messages into the speech queue.

use std::sync::Arc;

use tracing::debug;

use danmu_core::{AppEvent, AppEventEmitter, ChatEvent, ChatListener};

use crate::queue::SpeechQueue;

/// [`ChatListener`] that enqueues each message's speech text.
///
/// Blank messages are ignored. An eviction is reported as
/// [`AppEvent::SpeechDropped`].
pub struct SpeechFeeder {
    queue: SpeechQueue,
    emitter: Arc<dyn AppEventEmitter>,
}

impl SpeechFeeder {
    pub fn new(queue: SpeechQueue, emitter: Arc<dyn AppEventEmitter>) -> Self {
        Self { queue, emitter }
    }
}

impl ChatListener for SpeechFeeder {
    fn on_chat(&self, event: &ChatEvent) {
        let text = event.speech_text();
        if text.is_empty() {
            return;
        }

        if let Some(dropped) = self.queue.enqueue(text) {
            debug!(dropped = %dropped, "Speech queue full, dropped oldest");
            self.emitter.emit(AppEvent::SpeechDropped { text: dropped });
        }
    }
}
