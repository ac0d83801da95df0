use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use occ_cli::commands::analyze;
use occ_cli::{Cli, Commands, Config};

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
        Some(Commands::Analyze {
            start,
            end,
            channel,
            input,
            split_minutes,
            include_open,
            json,
        }) => {
            let config =
                Config::load_from(cli.config.as_deref()).context("failed to load configuration")?;
            tracing::debug!(?config, "loaded configuration");

            let opts = analyze::AnalyzeOptions {
                start,
                end,
                channel: channel.as_deref(),
                input: input.as_deref(),
                split_minutes: *split_minutes,
                include_open: *include_open,
                json: *json,
            };
            analyze::run(&config, &opts)?;
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
