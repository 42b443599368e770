mod cmd;
mod config;
mod context;
mod domain;
mod error;
mod infra;
mod logging;
mod server;
mod services;
mod webhooks;
mod workflow;

#[cfg(test)]
mod test_utils;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::cmd::config::{self as config_cmd, ConfigArgs};
use crate::cmd::serve::{self, ServeArgs};
use crate::config::DEFAULT_CONFIG_PATH;
use crate::error::AppResult;

#[derive(Parser)]
#[command(
    name = "bugbridge",
    author,
    version,
    about = "Mirror Launchpad bugs into Jira"
)]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(long, global = true, env = "CONFIG_PATH", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the webhook server.
    Serve(ServeArgs),
    /// Inspect configuration and encode request overrides.
    Config(ConfigArgs),
}

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> AppResult<()> {
    let cli = Cli::parse();
    logging::init()?;

    match cli.command {
        Commands::Serve(args) => serve::run(args, &cli.config).await,
        Commands::Config(args) => config_cmd::run(args.command, &cli.config),
    }
}
