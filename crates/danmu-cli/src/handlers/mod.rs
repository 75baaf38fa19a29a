//! Command handlers.
//!
//! Each handler is `pub async fn execute(ctx: &CliContext, ...) -> Result<()>`:
//! validate CLI input, drive the composed components, print the outcome.

pub mod config;
pub mod run;
pub mod say;
pub mod voices;

use danmu_tts::SwitchError;

use crate::error::CliError;

/// An unknown voice name is a usage error; anything else is a runtime failure.
pub(crate) fn switch_error(err: SwitchError) -> CliError {
    match err {
        SwitchError::UnknownVoice(_) => CliError::Arguments(err.to_string()),
        other => CliError::Runtime(other.to_string()),
    }
}
