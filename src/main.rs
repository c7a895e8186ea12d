//! Agent Steward CLI entry point.

use anyhow::Result;
use clap::Parser;

use agent_steward::cli::commands::{cleanup, config, providers};
use agent_steward::cli::{handle_error, Cli, Commands, ConfigCommands};
use agent_steward::domain::models::Config;
use agent_steward::infrastructure::config::ConfigLoader;
use agent_steward::infrastructure::logging;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => ConfigLoader::load_with_file(path),
        None => ConfigLoader::load(),
    };

    let logging_config = loaded
        .as_ref()
        .map(|settings| settings.logging.clone())
        .unwrap_or_default();
    let _guard = match logging::init(&logging_config) {
        Ok(guard) => Some(guard),
        Err(err) => {
            eprintln!("Failed to initialize logging: {err:#}");
            None
        }
    };

    let json = cli.json;
    let result = match cli.command {
        Commands::Config(ConfigCommands::Validate) => config::validate(&loaded, cli.config.as_deref(), json),
        command => match loaded {
            Ok(settings) => run(command, &settings, json).await,
            Err(err) => Err(err),
        },
    };
    if let Err(err) = result {
        handle_error(&err, json);
    }
}

async fn run(command: Commands, settings: &Config, json: bool) -> Result<()> {
    match command {
        Commands::Cleanup(args) => cleanup::execute(args, settings, json).await,
        Commands::DeleteFiles(args) => cleanup::execute_delete_files(args, settings, json).await,
        Commands::Providers => providers::execute(settings, json),
        Commands::Config(ConfigCommands::Show) => config::show(settings, json),
        Commands::Config(ConfigCommands::Validate) => config::validate(&Ok(settings.clone()), None, json),
    }
}
