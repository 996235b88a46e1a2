//! Self-update pipeline for launcher-bootstrapped tool installations.
//!
//! An installation is a home directory with a `lib/` tree holding the tool's
//! modules and a `bin/` launcher that puts `lib/` on the interpreter's module
//! search path. Updating it means replacing `lib/` while the tool itself is
//! running from it, so every step is either side-effect free or undone
//! before it returns.
//!
//! # Architecture Overview
//!
//! ## Core Components
//!
//! - **[`ReleaseSelector`]**: Picks the target release from catalog candidates
//! - **[`ArchiveFetcher`]**: Downloads, verifies, and unpacks a release archive
//! - **[`InstallationSwapper`]**: Replaces `lib/` with backup and restore
//! - **[`LauncherGenerator`]**: Rewrites the launcher for the new tree
//! - **[`UpdateOrchestrator`]**: Runs the stages in order and owns the outcome
//!
//! ## Supporting Pieces
//!
//! - **[`ReleaseCatalog`]**: Where candidates come from ([`PypiCatalog`], [`StaticCatalog`])
//! - **[`InstallationLayout`]**: The home, bin, lib, and backup paths, resolved once
//! - **[`UpdateLock`]**: Keeps two updates from swapping the same layout
//!
//! ## Update Process Flow
//!
//! ```text
//! 1. Precondition
//!    └── Running executable must live under the installation home
//!
//! 2. Selection
//!    ├── Query the catalog with the requested constraint
//!    └── Highest match, pre-releases only with --preview
//!
//! 3. Fetch (temporary directory only)
//!    ├── Download checksum, then stream the archive through SHA-256
//!    └── Extract only after the digest matched
//!
//! 4. Swap (under the update lock)
//!    ├── lib/ → lib-backup/, new tree → lib/
//!    └── Restore lib-backup/ on failure
//!
//! 5. Launcher
//!    └── Probe interpreters, rewrite bin/<tool>
//! ```
//!
//! # Safety Mechanisms
//!
//! - Nothing under the home changes before the archive digest matched
//! - The backup is complete before the live tree starts being removed
//! - A failed swap restores the backup before returning
//! - A failed restore is reported separately with the backup location
//!
//! # Examples
//!
//! ```rust,no_run
//! use selfup_cli::config::UpdaterConfig;
//! use selfup_cli::upgrade::{
//!     CommandProbe, InstallationLayout, PypiCatalog, UpdateOrchestrator,
//! };
//!
//! # async fn example() -> Result<(), selfup_cli::core::UpdateError> {
//! let config = UpdaterConfig::default();
//! let layout = InstallationLayout::resolve(
//!     &config,
//!     |key| std::env::var(key).ok(),
//!     dirs::home_dir().as_deref(),
//! );
//! let catalog = PypiCatalog::new(&config)?;
//! let exe = std::env::current_exe().map_err(|e| selfup_cli::core::UpdateError::io("locate executable", e))?;
//!
//! let orchestrator = UpdateOrchestrator::new(config.clone(), layout, catalog, CommandProbe, exe)?;
//! let outcome = orchestrator.run(None, false).await?;
//! println!("{}", outcome.message(&config.tool_name));
//! # Ok(())
//! # }
//! ```

pub mod archive;
pub mod catalog;
pub mod fetcher;
pub mod launcher;
pub mod layout;
pub mod lock;
pub mod orchestrator;
pub mod release;
pub mod swap;
pub mod verification;


pub use catalog::{PypiCatalog, ReleaseCatalog, StaticCatalog};
pub use fetcher::{ArchiveFetcher, DownloadProgress, ExtractedTree};
pub use launcher::{
    CommandProbe, ExecutableResolver, LauncherGenerator, LauncherSpec, Platform, VersionProbe,
    set_executable,
};
pub use layout::InstallationLayout;
pub use lock::UpdateLock;
pub use orchestrator::{UpdateOrchestrator, UpdateOutcome};
pub use release::{
    NoneFoundReason, Release, ReleaseConstraint, ReleaseSelector, SelectionResult,
    parse_release_version,
};
pub use swap::InstallationSwapper;
pub use verification::{ChecksumVerifier, StreamingDigest};
