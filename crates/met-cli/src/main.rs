use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use met_cli::commands::{replay, send, summary};
use met_cli::{Cli, Commands, Config};

/// Load configuration for a command invocation.
fn load_config(config_path: Option<&Path>) -> Result<Config> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");
    Ok(config)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();

    match &cli.command {
        Some(Commands::Replay {
            log,
            visitor,
            session,
            pretty,
        }) => {
            let config = load_config(cli.config.as_deref())?;
            replay::run(log, visitor.as_deref(), session.as_deref(), *pretty, &config)?;
        }
        Some(Commands::Summary { log, json }) => {
            let config = load_config(cli.config.as_deref())?;
            summary::run(log, *json, &config)?;
        }
        Some(Commands::Send {
            log,
            endpoint,
            visitor,
        }) => {
            let config = load_config(cli.config.as_deref())?;
            let outcome = send::run(log, endpoint.clone(), visitor.clone(), &config)?;
            println!(
                "transmitted {} reports for session {}",
                outcome.transmitted, outcome.session
            );
        }
        None => {
            // No subcommand, show help
            use clap::CommandFactory;
            Cli::command().print_help()?;
            println!();
        }
    }

    Ok(())
}
