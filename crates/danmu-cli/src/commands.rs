//! Top-level subcommands.

use clap::Subcommand;

use danmu_core::ModelVersion;
use danmu_tts::BackendKind;

use crate::config_commands::ConfigCommand;

#[derive(Subcommand)]
pub enum Commands {
    /// Connect to the chat gateway and read messages aloud until Ctrl-C
    Run {
        /// Seconds to keep speaking queued messages after Ctrl-C (0 = stop at once)
        #[arg(long, default_value_t = 0)]
        drain_timeout: u64,
        /// Synthesis engine (gpt-sovits or edge)
        #[arg(long, default_value = "gpt-sovits")]
        engine: BackendKind,
    },
    /// Scan the weight directories and list available voices
    Voices {
        /// Model version to scan (v1, v2, v2Pro, v2ProPlus, v3, v4)
        #[arg(long)]
        version: Option<ModelVersion>,
        /// Switch the synthesis server to this voice after scanning
        #[arg(long)]
        activate: Option<String>,
    },
    /// Speak the given texts once and exit
    Say {
        /// Texts to speak, one clip each
        #[arg(required = true)]
        text: Vec<String>,
        /// Voice to switch to before speaking (default: first found)
        #[arg(long)]
        voice: Option<String>,
        /// Synthesis engine (gpt-sovits or edge)
        #[arg(long, default_value = "gpt-sovits")]
        engine: BackendKind,
    },
    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}
