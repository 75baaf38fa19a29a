//! Live event printer for `run` and `say`.

use danmu_core::{AppEvent, AppEventEmitter, ConnectionState};

/// Prints user-facing events to stdout as they happen.
///
/// Chat lines go to stdout; everything else is left to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleEmitter;

impl AppEventEmitter for ConsoleEmitter {
    fn emit(&self, event: AppEvent) {
        if let Some(line) = format_event(&event) {
            println!("{line}");
        }
    }
}

/// One console line for `event`, or `None` for events that only get logged.
pub fn format_event(event: &AppEvent) -> Option<String> {
    match event {
        AppEvent::ConnectionStatus { status } => Some(match status {
            ConnectionState::Connected => "● connected".to_string(),
            ConnectionState::Connecting => "○ connecting...".to_string(),
            ConnectionState::Retrying => "○ connection lost, retrying".to_string(),
            ConnectionState::Disconnected => "○ disconnected".to_string(),
        }),
        AppEvent::ChatReceived { event } => Some(event.display_line()),
        AppEvent::SpeechDropped { text } => Some(format!("  (skipped: {text})")),
        AppEvent::SynthesisFailed { text, error } => {
            Some(format!("  ✗ could not synthesize \"{text}\": {error}"))
        }
        AppEvent::PlaybackFailed { text, error } => {
            Some(format!("  ✗ could not play \"{text}\": {error}"))
        }
        AppEvent::VoiceActivated { name, version } => {
            Some(format!("✓ voice '{name}' active ({version})"))
        }
        AppEvent::VoiceSwitchFailed { name, error } => {
            Some(format!("✗ failed to switch to '{name}': {error}"))
        }
        AppEvent::SpeechStarted { .. }
        | AppEvent::SpeechFinished { .. }
        | AppEvent::VoicesScanned { .. } => None,
    }
}
