//! plugdeck CLI
//!
//! Installs, updates and removes the optional plugins of an SDK.

mod cli;
mod commands;
mod utils;

use std::process::ExitCode;

use clap::Parser;
use miette::Result;
use tracing::error;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use commands::compose::run_compose;
use commands::init::run_init;
use commands::list::run_list;
use commands::plugin::{PluginAction, run_plugin_action};
use commands::status::run_status;

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(refused) => {
            if refused {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            error!("{:?}", e);
            ExitCode::from(2)
        }
    }
}

/// Returns `Ok(true)` when the command ran but the operation was refused.
fn run(cli: Cli) -> Result<bool> {
    let config = cli.config.as_deref();
    match &cli.command {
        Commands::Init { force } => run_init(*force).map(|_| false),
        Commands::Status => run_status(config),
        Commands::List { format } => run_list(config, *format).map(|_| false),
        Commands::Install { name } => run_plugin_action(config, PluginAction::Install, name),
        Commands::Update { name } => run_plugin_action(config, PluginAction::Update, name),
        Commands::Remove { name } => run_plugin_action(config, PluginAction::Remove, name),
        Commands::Compose => run_compose(config).map(|_| false),
    }
}
