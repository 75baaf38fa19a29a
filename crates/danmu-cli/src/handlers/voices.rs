//! `danmu voices`: scan, list, and optionally switch voices.

use anyhow::Result;

use danmu_core::ModelVersion;

use crate::bootstrap::CliContext;
use crate::error::CliError;
use crate::handlers::switch_error;
use crate::presentation::{format_voice_row, print_separator};

pub async fn execute(
    ctx: &CliContext,
    version: Option<ModelVersion>,
    activate: Option<String>,
) -> Result<()> {
    let registry = ctx.registry();
    if let Some(version) = version {
        registry.set_version(version);
    }

    registry
        .scan()
        .await
        .map_err(|e| CliError::Runtime(e.to_string()))?;

    if let Some(name) = activate {
        registry.switch_weights(&name).await.map_err(switch_error)?;
    }

    let active = registry.active().await.map(|voice| voice.name);
    println!("Voices for {}:", registry.version());
    print_separator(96);
    for pair in registry.voices() {
        let is_active = active.as_deref() == Some(pair.name.as_str());
        println!("{}", format_voice_row(&pair, is_active));
    }
    Ok(())
}
