//! Autoskope CLI - Command-line tool for the Autoskope vehicle-tracking portal
//!
//! Logs in with the configured account and lists its tracked vehicles.

mod commands;
mod config;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use autoskope_client::{AutoskopeClient, AutoskopeError};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::{CliOverrides, Config};
use crate::output::{OutputContext, OutputFormat};

#[derive(Parser)]
#[command(name = "autoskope-cli")]
#[command(author, version, about = "Autoskope Vehicle Tracking CLI")]
#[command(propagate_version = true)]
struct Cli {
    /// Portal URL [default: https://portal.autoskope.de]
    #[arg(long, env = "AUTOSKOPE_HOST")]
    host: Option<String>,

    /// Account username
    #[arg(short, long, env = "AUTOSKOPE_USERNAME")]
    username: Option<String>,

    /// Account password
    #[arg(short, long, env = "AUTOSKOPE_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Request timeout in seconds
    #[arg(short, long)]
    timeout: Option<u64>,

    /// Configuration file path
    #[arg(short, long, env = "AUTOSKOPE_CONFIG")]
    config: Option<PathBuf>,

    /// Output format [default: table]
    #[arg(short, long, value_enum)]
    output: Option<OutputFormat>,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Minimal output (for scripting)
    #[arg(short, long)]
    quiet: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check the configured credentials
    Login,

    /// List tracked vehicles with their last known position
    Vehicles,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();

    // Load config file
    let config = if let Some(config_path) = &cli.config {
        Config::load_from(config_path)?
    } else {
        Config::load().unwrap_or_default()
    };

    // Merge CLI args with config
    let merged = config.merge_with_args(&CliOverrides {
        host: cli.host.as_deref(),
        username: cli.username.as_deref(),
        password: cli.password.as_deref(),
        timeout_secs: cli.timeout,
        output: cli.output,
        no_color: cli.no_color,
    })?;
    tracing::debug!(host = %merged.host, username = %merged.username, "Resolved configuration");

    let ctx = OutputContext::new(merged.output, merged.no_color, cli.quiet);
    let mut client = AutoskopeClient::new(merged.transport_config()?);

    let result = match cli.command {
        Commands::Login => commands::login(&mut client, &ctx).await,
        Commands::Vehicles => commands::vehicles(&mut client, &ctx).await,
    };

    match result {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(err) => match err.downcast_ref::<AutoskopeError>() {
            Some(AutoskopeError::InvalidAuth(msg)) => {
                ctx.error(&format!("Login rejected: {}", msg));
                Ok(ExitCode::from(2))
            }
            Some(AutoskopeError::CannotConnect(msg)) => {
                ctx.error(&format!("Cannot reach portal: {}", msg));
                Ok(ExitCode::FAILURE)
            }
            None => Err(err),
        },
    }
}
