//! End-to-end self-update transaction.
//!
//! [`UpdateOrchestrator::run`] is the only place that knows the whole
//! sequence: precondition check, release selection, fetch, swap, launcher.
//! Each stage returns a `Result` and the first failure ends the run.

use semver::Version;
use std::path::PathBuf;
use tracing::{error, info, warn};

use super::catalog::ReleaseCatalog;
use super::fetcher::ArchiveFetcher;
use super::launcher::{ExecutableResolver, LauncherGenerator, Platform, VersionProbe};
use super::layout::InstallationLayout;
use super::lock::UpdateLock;
use super::release::{NoneFoundReason, Release, ReleaseConstraint, ReleaseSelector, SelectionResult};
use super::swap::InstallationSwapper;
use crate::config::UpdaterConfig;
use crate::core::UpdateError;

/// Result of a run that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// A new release is installed and the launcher was regenerated
    Updated {
        release: Release,
        launcher: PathBuf,
    },
    /// The best matching release is the running version
    AlreadyCurrent {
        version: Version,
    },
    /// Nothing to install
    NoneFound {
        reason: NoneFoundReason,
    },
}

impl UpdateOutcome {
    /// Message shown to the user for this outcome.
    pub fn message(&self, tool_name: &str) -> String {
        match self {
            Self::Updated {
                release,
                ..
            } => format!("{} ({release}) is installed now. Great!", capitalize(tool_name)),
            Self::AlreadyCurrent {
                ..
            } => "You are using the latest version".to_string(),
            Self::NoneFound {
                reason,
            } => reason.message().to_string(),
        }
    }
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    chars.next().map_or_else(String::new, |first| first.to_uppercase().chain(chars).collect())
}

/// Sequences selection, fetch, swap, and launcher regeneration.
pub struct UpdateOrchestrator<C, P> {
    config: UpdaterConfig,
    layout: InstallationLayout,
    catalog: C,
    resolver: ExecutableResolver<P>,
    fetcher: ArchiveFetcher,
    launcher: LauncherGenerator,
    current_version: Version,
    current_exe: PathBuf,
}

impl<C, P> UpdateOrchestrator<C, P>
where
    C: ReleaseCatalog,
    P: VersionProbe,
{
    /// Orchestrator for the running binary.
    ///
    /// The current version is read from the installed library tree, and is
    /// `0.0.0` when the tree has no readable version marker. `current_exe` is
    /// checked against the layout before anything else happens.
    pub fn new(
        config: UpdaterConfig,
        layout: InstallationLayout,
        catalog: C,
        probe: P,
        current_exe: PathBuf,
    ) -> Result<Self, UpdateError> {
        let fetcher = ArchiveFetcher::new(&config)?;
        let launcher = LauncherGenerator::new(&config.tool_name, &config.entry_module);
        Ok(Self {
            resolver: ExecutableResolver::for_platform(Platform::current(), probe),
            current_version: layout
                .installed_version(&config.tool_name)
                .unwrap_or_else(|| Version::new(0, 0, 0)),
            config,
            layout,
            catalog,
            fetcher,
            launcher,
            current_exe,
        })
    }

    #[must_use]
    pub fn with_current_version(mut self, version: Version) -> Self {
        self.current_version = version;
        self
    }

    /// Draw download progress.
    #[must_use]
    pub fn with_progress(mut self, enabled: bool) -> Self {
        self.fetcher = self.fetcher.with_progress(enabled);
        self
    }

    /// Platform used for archive names and launcher flavor.
    #[must_use]
    pub fn with_platform(mut self, platform: Platform, identifier: &str) -> Self {
        self.fetcher = self.fetcher.with_platform(identifier);
        self.launcher = self.launcher.with_platform(platform);
        self
    }

    /// Interpreter candidates to probe instead of the platform defaults.
    #[must_use]
    pub fn with_resolver(mut self, resolver: ExecutableResolver<P>) -> Self {
        self.resolver = resolver;
        self
    }

    #[must_use]
    pub fn with_user_home(mut self, user_home: Option<PathBuf>) -> Self {
        self.launcher = self.launcher.with_user_home(user_home);
        self
    }

    pub const fn layout(&self) -> &InstallationLayout {
        &self.layout
    }

    pub const fn current_version(&self) -> &Version {
        &self.current_version
    }

    /// Run one update.
    ///
    /// `version` is the requested constraint; without one, any release at
    /// least as new as the running version qualifies.
    ///
    /// # Errors
    ///
    /// Returns the first failing stage's [`UpdateError`]. Failures before the
    /// swap leave the installation untouched.
    pub async fn run(
        &self,
        version: Option<&str>,
        allow_prereleases: bool,
    ) -> Result<UpdateOutcome, UpdateError> {
        self.check_supported_installation()?;

        let constraint = match version {
            Some(requested) => ReleaseConstraint::parse(requested)?,
            None => ReleaseConstraint::at_least(&self.current_version),
        };

        let candidates = self.catalog.find_releases(&constraint, allow_prereleases).await?;
        let release = match ReleaseSelector::select(
            &candidates,
            &constraint,
            allow_prereleases,
            &self.current_version,
        ) {
            SelectionResult::NoneFound(reason) => {
                info!("{}", reason.message());
                return Ok(UpdateOutcome::NoneFound {
                    reason,
                });
            }
            SelectionResult::AlreadyCurrent(release) => {
                info!("Already at {release}");
                return Ok(UpdateOutcome::AlreadyCurrent {
                    version: release.version().clone(),
                });
            }
            SelectionResult::Selected(release) => release,
        };

        info!("Updating to {release}");
        self.install(&release).await
    }

    fn check_supported_installation(&self) -> Result<(), UpdateError> {
        if self.layout.contains(&self.current_exe) {
            return Ok(());
        }
        Err(UpdateError::UnsupportedInstallation {
            tool: capitalize(&self.config.tool_name),
            executable: self.current_exe.clone(),
            home: self.layout.home().to_path_buf(),
        })
    }

    async fn install(&self, release: &Release) -> Result<UpdateOutcome, UpdateError> {
        let tree = self.fetcher.fetch(release, &self.config.release_base_url).await?;

        let _lock = UpdateLock::acquire(&self.layout).await?;

        let layout = self.layout.clone();
        let new_tree = tree.root().to_path_buf();
        let swapped = tokio::task::spawn_blocking(move || {
            InstallationSwapper::new(&layout).swap(&new_tree)
        })
        .await
        .map_err(|e| UpdateError::Swap {
            operation: "run the installation swap".to_string(),
            reason: e.to_string(),
        })?;

        if let Err(error) = swapped {
            if error.is_data_loss_risk() {
                error!("Update to {release} failed and the previous installation could not be restored: {error}");
            } else {
                warn!("Update to {release} failed, previous installation kept: {error}");
            }
            return Err(error);
        }
        drop(tree);

        let interpreter = self.resolver.resolve();
        let spec = self.launcher.generate(&self.layout, &interpreter)?;

        Ok(UpdateOutcome::Updated {
            release: release.clone(),
            launcher: spec.script_path,
        })
    }
}
