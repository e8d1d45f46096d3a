use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info};
use tuffysearch::cli::{Args, Command};
use tuffysearch::commands;
use tuffysearch::config::Config;
use tuffysearch::logging::setup_logging;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("failed to load config: {e:#}");
            return ExitCode::FAILURE;
        }
    };
    setup_logging(&config, args.tracing);

    info!(version = env!("CARGO_PKG_VERSION"), "starting tuffysearch");

    let result = match args.command {
        Command::Scrape { output } => commands::scrape(&config, output).await,
        Command::LoadDb { input } => commands::load_db(&config, input).await,
        Command::Index { input } => commands::index(&config, input).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = ?e, "job failed");
            ExitCode::FAILURE
        }
    }
}
