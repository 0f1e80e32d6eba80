//! reposync CLI
//!
//! Command-line client for the repository metadata service.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use reposync_core::Config;

mod commands;
mod logging;
mod output;

use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "reposync")]
#[command(about = "reposync - keep your private repository list in sync")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Use this config file instead of the default
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List tracked (private) repositories
    #[command(alias = "ls")]
    List,
    /// Create a repository
    #[command(alias = "add")]
    Create {
        /// Repository name
        name: String,
        /// Create under this team (dotted path, e.g. acme.eng)
        #[arg(short, long)]
        team: Option<String>,
        /// Notify team members
        #[arg(long, requires = "team")]
        notify: bool,
    },
    /// Delete a repository
    #[command(alias = "rm")]
    Delete {
        /// Repository name
        name: String,
        /// Team owning the repository (dotted path)
        #[arg(short, long)]
        team: Option<String>,
        /// Notify team members
        #[arg(long, requires = "team")]
        notify: bool,
    },
    /// Keep the list live, reloading on pushed notifications
    Watch,
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (server_url, notify_url, layout, request_timeout_secs, log_level, log_file)
        key: String,
        /// Configuration value
        value: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));
    let config_path = cli.config.as_ref();

    // Config commands must work even when the file is broken
    if let Commands::Config { command } = &cli.command {
        return match command.clone() {
            Some(ConfigCommands::Show) | None => commands::config::show(config_path, &output),
            Some(ConfigCommands::Set { key, value }) => {
                commands::config::set(key, value, config_path, &output)
            }
        };
    }

    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;
    logging::init(&config, cli.verbose);

    match cli.command {
        Commands::List => commands::repo::list(&config, &output).await,
        Commands::Create { name, team, notify } => {
            commands::repo::create(&config, name, team, notify, &output).await
        }
        Commands::Delete { name, team, notify } => {
            commands::repo::delete(&config, name, team, notify, &output).await
        }
        Commands::Watch => commands::watch::run(&config, &output).await,
        Commands::Config { .. } => unreachable!(), // Handled above
    }
}
