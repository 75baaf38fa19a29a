//! Configuration subcommands.

use std::path::PathBuf;

use clap::Subcommand;

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Write a configuration file filled with defaults
    Template {
        /// Where to write it (defaults to the --config path)
        #[arg(long)]
        output: Option<PathBuf>,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print the effective configuration (file + environment overrides)
    Show,
}
