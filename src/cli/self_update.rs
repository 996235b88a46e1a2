//! `self-update` command.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use std::env;

use super::CliConfig;
use crate::config::UpdaterConfig;
use crate::upgrade::{CommandProbe, InstallationLayout, PypiCatalog, UpdateOrchestrator, UpdateOutcome};
use crate::utils::platform::resolve_path;

/// Update the installed tool in place.
///
/// # Examples
///
/// ```bash
/// selfup self-update              # newest stable release
/// selfup self-update 1.2.0        # exactly 1.2.0
/// selfup self-update '>=1.2,<2'   # newest release in a range
/// selfup self-update --preview    # allow pre-releases
/// ```
#[derive(Args, Debug)]
pub struct SelfUpdateCommand {
    /// Version or version requirement to update to
    #[arg(value_name = "VERSION")]
    pub version: Option<String>,

    /// Allow pre-release versions
    #[arg(long)]
    pub preview: bool,
}

impl SelfUpdateCommand {
    pub async fn execute(self, cli: &CliConfig, quiet: bool) -> Result<()> {
        let config_path = cli
            .config_path
            .as_deref()
            .map(|path| resolve_path(&path.to_string_lossy()))
            .transpose()?;
        let config = UpdaterConfig::load_with_optional(config_path).await?;
        let user_home = dirs::home_dir();
        let layout =
            InstallationLayout::resolve(&config, |key| env::var(key).ok(), user_home.as_deref());
        let current_exe = env::current_exe().context("Failed to get current executable path")?;

        let catalog = PypiCatalog::new(&config)?;
        let orchestrator =
            UpdateOrchestrator::new(config.clone(), layout, catalog, CommandProbe, current_exe)?
                .with_progress(!cli.no_progress)
                .with_user_home(user_home);

        if !quiet {
            println!(
                "{}",
                format!(
                    "Checking for {} updates (current: {})...",
                    config.tool_name,
                    orchestrator.current_version()
                )
                .cyan()
            );
        }

        let outcome = orchestrator.run(self.version.as_deref(), self.preview).await?;
        if !quiet {
            let message = outcome.message(&config.tool_name);
            match outcome {
                UpdateOutcome::Updated {
                    launcher,
                    ..
                } => {
                    println!("{}", message.green().bold());
                    println!("Launcher: {}", launcher.display());
                }
                UpdateOutcome::AlreadyCurrent {
                    ..
                } => println!("{}", message.green()),
                UpdateOutcome::NoneFound {
                    ..
                } => println!("{}", message.yellow()),
            }
        }
        Ok(())
    }
}
