//! Command-line interface for `gh_issues_local`.
//!
//! This module provides the CLI parsing and command routing using clap.

pub mod commands;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::warn;

use crate::config::{CliOverrides, Config, LogFormat};
use crate::logging;

/// `gh-issues-local` - Local GitHub Issues REST API.
#[derive(Parser, Debug)]
#[command(name = "gh-issues-local")]
#[command(
    author,
    version,
    about = "Local, self-hosted GitHub Issues REST API",
    long_about = None,
    after_help = "Point any GitHub Issues client at the printed URL. Data is kept in a JSONL file."
)]
#[allow(clippy::struct_excessive_bools)]
pub struct Cli {
    /// Path to a YAML config file
    #[arg(long, global = true, env = "CONFIG_FILE")]
    pub config: Option<PathBuf>,

    /// Directory holding the data file and auth token
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Address to bind
    #[arg(long, global = true)]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(short, long, global = true)]
    pub port: Option<u16>,

    /// Disable the bearer-token gate on non-local binds
    #[arg(long, global = true)]
    pub no_auth: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Verbose output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to run (default: serve)
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the API server
    Serve,

    /// Print the auth token, creating it if needed
    Token,

    /// Show version information
    Version(VersionArgs),
}

#[derive(Args, Debug, Default)]
pub struct VersionArgs {
    /// Output only the version number
    #[arg(long)]
    pub short: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl Cli {
    #[must_use]
    pub fn overrides(&self) -> CliOverrides {
        CliOverrides {
            config: self.config.clone(),
            data_dir: self.data_dir.clone(),
            host: self.host.clone(),
            port: self.port,
            no_auth: self.no_auth,
            log_json: self.log_json,
        }
    }
}

/// Run the CLI.
///
/// # Errors
///
/// Returns an error if configuration is invalid or the command fails.
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    if let Some(Commands::Version(args)) = &cli.command {
        return commands::version::execute(args);
    }

    let config = Config::load(&cli.overrides()).context("Failed to load configuration")?;
    let format = if cli.log_json {
        LogFormat::Json
    } else {
        config.logging.format
    };
    logging::init_logging(cli.verbose, cli.quiet, Some(format))
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {e}"))?;
    if let Some(path) = &config.missing_file {
        warn!(path = %path.display(), "config file not found; using defaults");
    }

    match cli.command {
        None | Some(Commands::Serve) => commands::serve::execute(&config),
        Some(Commands::Token) => commands::token::execute(&config),
        Some(Commands::Version(_)) => Ok(()),
    }
}
