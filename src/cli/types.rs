//! CLI type definitions
//!
//! This module contains clap command structures that define the CLI interface.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use super::commands::cleanup::{CleanupArgs, DeleteFilesArgs};

#[derive(Parser, Debug)]
#[command(name = "agent-steward")]
#[command(about = "Agent Steward - lifecycle and cleanup of hosted agents, vector stores, files and threads", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Configuration file (defaults to ./agent-steward.yaml)
    #[arg(short, long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Best-effort sweep of files, stores, threads and agents
    Cleanup(CleanupArgs),

    /// Delete specific files by id
    DeleteFiles(DeleteFilesArgs),

    /// List configured providers
    Providers,

    /// Configuration commands
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigCommands {
    /// Load and validate the configuration
    Validate,

    /// Print the effective configuration with keys redacted
    Show,
}
