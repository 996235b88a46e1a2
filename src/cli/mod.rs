//! Command-line interface for selfup.
//!
//! # Commands
//!
//! - `self-update [VERSION] [--preview]` - Update the installed tool in place
//!
//! # Global Options
//!
//! - `--verbose` / `-v`: debug logging
//! - `--quiet` / `-q`: errors only, no progress bars
//! - `--no-progress`: hide the download progress bar
//! - `--config <path>`: configuration file instead of `~/.selfup/config.toml`
//!
//! # Examples
//!
//! ```bash
//! # Update to the newest stable release
//! selfup self-update
//!
//! # Update to a specific version, including pre-releases
//! selfup self-update 1.3.0a1 --preview
//!
//! # Quiet update with a custom release mirror
//! selfup --quiet --config ./mirror.toml self-update
//! ```

mod self_update;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Settings derived from global flags, handed to commands explicitly.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    /// Log filter directive; `None` defers to `RUST_LOG` (or `warn`)
    pub log_level: Option<String>,
    /// Hide progress bars
    pub no_progress: bool,
    /// Configuration file override
    pub config_path: Option<PathBuf>,
}

impl CliConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the global tracing subscriber writing to stderr.
    ///
    /// Calling it again after a subscriber is installed has no effect.
    pub fn init_logging(&self) {
        let filter = match &self.log_level {
            Some(level) => EnvFilter::new(level),
            None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    }
}

/// Main CLI structure.
#[derive(Parser)]
#[command(
    name = "selfup",
    about = "Self-updating installer for launcher-bootstrapped tools",
    version,
    long_about = "selfup replaces an installed tool's library tree with a newer verified release, \
                  backing up the current tree and restoring it if anything fails."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Path to the configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Disable progress bars
    #[arg(long, global = true)]
    no_progress: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Update the installed tool to a newer release
    SelfUpdate(self_update::SelfUpdateCommand),
}

impl Cli {
    /// Execute the parsed command.
    pub async fn execute(self) -> Result<()> {
        let config = self.build_config();
        config.init_logging();
        self.execute_with_config(config).await
    }

    /// Derive the [`CliConfig`] from global flags.
    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.verbose {
            Some("debug".to_string())
        } else if self.quiet {
            Some("error".to_string())
        } else {
            None
        };

        CliConfig {
            log_level,
            no_progress: self.no_progress || self.quiet,
            config_path: self.config.clone(),
        }
    }

    /// Execute with an explicit configuration.
    pub async fn execute_with_config(self, config: CliConfig) -> Result<()> {
        match self.command {
            Commands::SelfUpdate(cmd) => cmd.execute(&config, self.quiet).await,
        }
    }
}
