//! CLI entry point.
//!
//! Loads configuration, builds the context in `bootstrap`, and routes each
//! command to its handler.

use std::path::Path;
use std::process::ExitCode;

use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use danmu_cli::config::load_settings;
use danmu_cli::error::exit_code_for;
use danmu_cli::{Cli, CliContext, Commands, bootstrap, handlers};

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env before parsing so DANMU_CONFIG can come from it
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::from(u8::try_from(exit_code_for(&err)).unwrap_or(1))
        }
    }
}

/// `RUST_LOG` wins; otherwise `info`, or `debug` with `-v`.
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn context(config_path: &Path) -> anyhow::Result<CliContext> {
    let settings = load_settings(config_path)?;
    Ok(bootstrap(settings)?)
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    match command {
        Commands::Config { command } => handlers::config::execute(&cli.config, command)?,
        Commands::Run {
            drain_timeout,
            engine,
        } => {
            let ctx = context(&cli.config)?;
            handlers::run::execute(&ctx, drain_timeout, engine).await?;
        }
        Commands::Voices { version, activate } => {
            let ctx = context(&cli.config)?;
            handlers::voices::execute(&ctx, version, activate).await?;
        }
        Commands::Say {
            text,
            voice,
            engine,
        } => {
            let ctx = context(&cli.config)?;
            handlers::say::execute(&ctx, text, voice, engine).await?;
        }
    }
    Ok(())
}
