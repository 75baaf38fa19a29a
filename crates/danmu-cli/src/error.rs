//! CLI error type and exit-code mapping.

use danmu_core::SettingsError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    /// The configuration file could not be read or parsed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The configuration parsed but failed validation.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(#[from] SettingsError),

    /// Arguments that clap accepted but are unusable.
    #[error("Invalid arguments: {0}")]
    Arguments(String),

    /// IO error (permission denied, disk full, ...).
    #[error("IO error: {0}")]
    Io(String),

    /// A runtime failure (no voices, synthesis server down, no audio device).
    #[error("{0}")]
    Runtime(String),
}

impl CliError {
    /// Map error to a process exit code.
    ///
    /// - 1: runtime failure
    /// - 2: invalid configuration or usage
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::InvalidConfig(_) | Self::Arguments(_) => 2,
            Self::Io(_) | Self::Runtime(_) => 1,
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// Exit code for an error returned from a handler.
pub fn exit_code_for(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<CliError>().map_or(1, CliError::exit_code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(CliError::Config("bad json".into()).exit_code(), 2);
        assert_eq!(CliError::from(SettingsError::NoTaskIds).exit_code(), 2);
        assert_eq!(CliError::Runtime("no voices".into()).exit_code(), 1);
    }

    #[test]
    fn test_exit_code_through_anyhow() {
        let err = anyhow::Error::new(CliError::Arguments("x".into()));
        assert_eq!(exit_code_for(&err), 2);
        let err = anyhow::anyhow!("something else");
        assert_eq!(exit_code_for(&err), 1);
    }
}
