//! Configuration loading: JSON file, environment overrides, validation.

use std::path::Path;

use tracing::{info, warn};

use danmu_core::{Settings, validate_settings};

use crate::error::CliError;

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "DANMU_CONFIG";
/// Default config file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config.json";
/// Overrides `danmakuClient.rsocketUrl`.
pub const GATEWAY_URL_ENV: &str = "DANMU_GATEWAY_URL";
/// Overrides `ttsClient.ai.apiUrl`.
pub const TTS_API_URL_ENV: &str = "DANMU_TTS_API_URL";

/// Load, override from the process environment, and validate.
pub fn load_settings(path: &Path) -> Result<Settings, CliError> {
    load_settings_with(path, |key| std::env::var(key).ok())
}

/// [`load_settings`] with an injectable environment lookup.
pub fn load_settings_with(
    path: &Path,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<Settings, CliError> {
    let mut settings = read_settings_file(path)?;
    apply_env_overrides(&mut settings, lookup);
    validate_settings(&settings)?;
    Ok(settings)
}

/// Parse the config file. A missing file yields the defaults.
pub fn read_settings_file(path: &Path) -> Result<Settings, CliError> {
    match std::fs::read_to_string(path) {
        Ok(contents) => serde_json::from_str(&contents)
            .map_err(|e| CliError::Config(format!("{}: {e}", path.display()))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!(path = %path.display(), "Config file not found, using defaults");
            Ok(Settings::default())
        }
        Err(e) => Err(CliError::Config(format!(
            "cannot read {}: {e}",
            path.display()
        ))),
    }
}

/// Apply `DANMU_*` overrides. Blank values are ignored.
///
/// Returns the names of the variables that were applied.
pub fn apply_env_overrides(
    settings: &mut Settings,
    lookup: impl Fn(&str) -> Option<String>,
) -> Vec<&'static str> {
    let mut applied = Vec::new();
    let value = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(url) = value(GATEWAY_URL_ENV) {
        settings.gateway.url = url;
        applied.push(GATEWAY_URL_ENV);
    }
    if let Some(url) = value(TTS_API_URL_ENV) {
        settings.speech.sovits.api_url = url;
        applied.push(TTS_API_URL_ENV);
    }

    if !applied.is_empty() {
        info!(overrides = ?applied, "Applied environment overrides");
    }
    applied
}

/// Pretty JSON in the config file format.
pub fn render_settings(settings: &Settings) -> Result<String, CliError> {
    serde_json::to_string_pretty(settings).map_err(|e| CliError::Config(e.to_string()))
}

/// Write the default configuration to `path`.
///
/// Refuses to overwrite an existing file unless `force` is set.
pub fn write_template(path: &Path, force: bool) -> Result<(), CliError> {
    if path.exists() && !force {
        return Err(CliError::Arguments(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )));
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let mut contents = render_settings(&Settings::default())?;
    contents.push('\n');
    std::fs::write(path, contents)?;
    Ok(())
}
