//! `danmu config`: write a template or show the effective configuration.

use std::path::Path;

use anyhow::Result;

use crate::config::{load_settings, render_settings, write_template};
use crate::config_commands::ConfigCommand;

/// Runs before bootstrap so a broken config file can still be replaced.
pub fn execute(config_path: &Path, command: ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::Template { output, force } => {
            let path = output.as_deref().unwrap_or(config_path);
            write_template(path, force)?;
            println!("✓ Wrote default configuration to {}", path.display());
        }
        ConfigCommand::Show => {
            let settings = load_settings(config_path)?;
            println!("{}", render_settings(&settings)?);
        }
    }
    Ok(())
}
