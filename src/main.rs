//! Worktrack - CLI entry point
//!
//! Runs the interactive tracking console and manages the configuration file.

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

/// Work session tracker
#[derive(Parser)]
#[command(name = "worktrack")]
#[command(version, about = "Work session tracker")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands for the worktrack CLI
#[derive(Subcommand)]
enum Commands {
    /// Start the interactive tracking console
    Run {
        /// Configuration file to use instead of the default location
        #[arg(long)]
        config: Option<PathBuf>,

        /// Pre-create a manual task with this title (repeatable)
        #[arg(long = "task", value_name = "TITLE")]
        tasks: Vec<String>,
    },

    /// Manage configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Actions for the `config` subcommand.
#[derive(Subcommand)]
enum ConfigAction {
    /// Create default configuration file
    Init {
        /// Overwrite existing configuration (creates backup)
        #[arg(long)]
        force: bool,
    },
    /// Show configuration file path
    Path,
    /// Validate configuration file
    Validate,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config, tasks } => {
            commands::run_console_command(config.as_deref(), &tasks)
        }
        Commands::Config { action } => match action {
            ConfigAction::Init { force } => commands::run_config_init_command(force),
            ConfigAction::Path => commands::run_config_path_command(),
            ConfigAction::Validate => commands::run_config_validate_command(),
        },
    }
}
