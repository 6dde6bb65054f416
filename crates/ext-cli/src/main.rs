//! Extension host CLI
//!
//! Inspects an installed-extension registry: validates declarations, shows
//! the load plan and synchronises extension content.

mod cli;
mod commands;
mod context;
mod error;

use clap::Parser;
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use context::RegistryContext;
use error::Result;

fn main() {
    if let Err(e) = run() {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = cli.config.as_deref();
    match cli.command {
        Commands::Validate { registry } => {
            commands::run_validate(&RegistryContext::load(&registry, config)?, cli.json)
        }
        Commands::Plan { registry } => {
            commands::run_plan(&RegistryContext::load(&registry, config)?, cli.json)
        }
        Commands::Sync {
            registry,
            target,
            force,
        } => commands::run_sync(
            &RegistryContext::load(&registry, config)?,
            target.as_deref(),
            force,
            cli.json,
        ),
        Commands::List { registry } => {
            commands::run_list(&RegistryContext::load(&registry, config)?, cli.json)
        }
    }
}

/// Logs go to stderr so JSON on stdout stays machine-readable.
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("EXTHOST_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let initialized = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init();
    if initialized.is_ok() && verbose {
        tracing::debug!("Verbose mode enabled");
    }
}
