mod cli;
mod commands;
mod config;
mod error;
mod logging;
mod providers;
mod simulator;
mod utils;

use crate::cli::{Cli, Commands};
use crate::error::{CliError, Result};
use clap::Parser;
use tracing::{debug, error, info};

const EXIT_ERROR: i32 = 1;

#[tokio::main]
async fn main() {
    match run_app().await {
        Ok(code) => std::process::exit(i32::from(code)),
        Err(e) => {
            eprintln!("\n❌ Error: {}", e);
            std::process::exit(EXIT_ERROR);
        }
    }
}

async fn run_app() -> Result<u8> {
    let cli = Cli::parse();
    logging::setup_logging(cli.verbose, cli.quiet, cli.log_file.clone())?;

    let (panic_hook, eyre_hook) = color_eyre::config::HookBuilder::default().into_hooks();
    eyre_hook.install().map_err(|e| CliError::Other(e.into()))?;
    std::panic::set_hook(Box::new(move |pi| {
        error!("{}", panic_hook.panic_report(pi));
    }));

    info!("procdesign v{} starting up.", env!("CARGO_PKG_VERSION"));
    debug!("Full CLI arguments parsed: {:?}", &cli);

    let command_result = match cli.command {
        Commands::Run(args) => {
            info!("Dispatching to 'run' command.");
            commands::run::run(args).await
        }
        Commands::Check(args) => {
            info!("Dispatching to 'check' command.");
            commands::check::run(args).await
        }
        Commands::Validate(args) => {
            info!("Dispatching to 'validate' command.");
            commands::validate::run(args).await
        }
    };

    match &command_result {
        Ok(code) => info!("Command finished with exit code {}.", code),
        Err(e) => error!("Command failed: {}", e),
    }
    command_result
}
