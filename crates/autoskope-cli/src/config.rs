//! Configuration file handling for autoskope-cli

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use autoskope_client::TransportConfig;
use serde::{Deserialize, Serialize};

use crate::output::OutputFormat;

/// Portal used when neither flag, environment, nor config file name one
pub const DEFAULT_HOST: &str = "https://portal.autoskope.de";

/// Configuration for the CLI tool
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Portal URL
    pub host: Option<String>,
    /// Account username
    pub username: Option<String>,
    /// Account password
    pub password: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: Option<u64>,
    /// Default output format
    pub output: Option<OutputFormat>,
    /// Disable colored output
    pub no_color: Option<bool>,
}

/// Values given on the command line (or through their env fallbacks)
#[derive(Debug, Clone, Default)]
pub struct CliOverrides<'a> {
    pub host: Option<&'a str>,
    pub username: Option<&'a str>,
    pub password: Option<&'a str>,
    pub timeout_secs: Option<u64>,
    pub output: Option<OutputFormat>,
    pub no_color: bool,
}

impl Config {
    /// Load configuration from the default config file
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Get the default config file path
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?
            .join("autoskope-cli");

        Ok(config_dir.join("config.toml"))
    }

    /// Merge CLI arguments over config file values
    pub fn merge_with_args(&self, args: &CliOverrides<'_>) -> Result<MergedConfig> {
        let username = args
            .username
            .map(String::from)
            .or_else(|| self.username.clone())
            .context("Username is required (--username or AUTOSKOPE_USERNAME)")?;
        let password = args
            .password
            .map(String::from)
            .or_else(|| self.password.clone())
            .context("Password is required (--password or AUTOSKOPE_PASSWORD)")?;

        Ok(MergedConfig {
            host: args
                .host
                .map(String::from)
                .or_else(|| self.host.clone())
                .unwrap_or_else(|| DEFAULT_HOST.to_string()),
            username,
            password,
            timeout_secs: args.timeout_secs.or(self.timeout_secs),
            output: args.output.or(self.output).unwrap_or_default(),
            no_color: args.no_color || self.no_color.unwrap_or(false),
        })
    }
}

/// Fully resolved configuration after merging CLI args
#[derive(Debug, Clone)]
pub struct MergedConfig {
    pub host: String,
    pub username: String,
    pub password: String,
    pub timeout_secs: Option<u64>,
    pub output: OutputFormat,
    pub no_color: bool,
}

impl MergedConfig {
    /// Validate into the client's transport configuration
    pub fn transport_config(&self) -> Result<TransportConfig> {
        let mut builder = TransportConfig::builder(&self.host)
            .credentials(&self.username, &self.password);
        if let Some(secs) = self.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        builder.build().context("Invalid client configuration")
    }
}
