//! Root CLI parser and global options.

use std::path::PathBuf;

use clap::Parser;

use crate::commands::Commands;
use crate::config::{CONFIG_ENV, DEFAULT_CONFIG_PATH};

/// Read live-stream chat aloud with GPT-SoVITS.
#[derive(Parser)]
#[command(name = "danmu")]
#[command(about = "Read live-stream chat aloud with GPT-SoVITS")]
#[command(version)]
pub struct Cli {
    /// Path to the JSON configuration file
    #[arg(long, global = true, env = CONFIG_ENV, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config_commands::ConfigCommand;
    use clap::CommandFactory;
    use danmu_core::ModelVersion;
    use danmu_tts::BackendKind;

    #[test]
    fn test_cli_parser_builds() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_args() {
        let cli = Cli::parse_from(["danmu", "run", "-v", "--config", "/tmp/c.json"]);
        assert!(cli.verbose);
        assert_eq!(cli.config, PathBuf::from("/tmp/c.json"));
    }

    #[test]
    fn test_run_defaults() {
        let cli = Cli::parse_from(["danmu", "run"]);
        match cli.command {
            Some(Commands::Run {
                drain_timeout,
                engine,
            }) => {
                assert_eq!(drain_timeout, 0);
                assert_eq!(engine, BackendKind::GptSovits);
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn test_voices_version_parses() {
        let cli = Cli::parse_from([
            "danmu",
            "voices",
            "--version",
            "v2ProPlus",
            "--activate",
            "alice",
        ]);
        match cli.command {
            Some(Commands::Voices { version, activate }) => {
                assert_eq!(version, Some(ModelVersion::V2ProPlus));
                assert_eq!(activate.as_deref(), Some("alice"));
            }
            _ => panic!("expected voices"),
        }
        assert!(Cli::try_parse_from(["danmu", "voices", "--version", "v9"]).is_err());
    }

    #[test]
    fn test_say_requires_text() {
        assert!(Cli::try_parse_from(["danmu", "say"]).is_err());
        let cli = Cli::parse_from(["danmu", "say", "hello", "world", "--engine", "edge"]);
        match cli.command {
            Some(Commands::Say { text, voice, engine }) => {
                assert_eq!(text, ["hello", "world"]);
                assert_eq!(voice, None);
                assert_eq!(engine, BackendKind::Edge);
            }
            _ => panic!("expected say"),
        }
    }

    #[test]
    fn test_config_template_flags() {
        let cli = Cli::parse_from([
            "danmu",
            "config",
            "template",
            "--output",
            "out.json",
            "--force",
        ]);
        match cli.command {
            Some(Commands::Config {
                command: ConfigCommand::Template { output, force },
            }) => {
                assert_eq!(output, Some(PathBuf::from("out.json")));
                assert!(force);
            }
            _ => panic!("expected config template"),
        }
    }
}
