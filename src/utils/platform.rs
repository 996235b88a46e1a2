//! Platform-specific utilities and cross-platform compatibility helpers
//!
//! This module hides the platform differences the updater cares about:
//!
//! - Home directory resolution and tilde expansion
//! - The platform identifier used in release archive names
//! - Path containment checks that survive symlinked homes
//!
//! # Examples
//!
//! ```rust,no_run
//! use selfup_cli::utils::platform::{get_home_dir, platform_identifier, resolve_path};
//!
//! # fn example() -> anyhow::Result<()> {
//! let home = get_home_dir()?;
//! let config = resolve_path("~/.selfup/config.toml")?;
//! println!("{} {} {}", home.display(), config.display(), platform_identifier());
//! # Ok(())
//! # }
//! ```

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Checks if the current platform is Windows.
#[must_use]
pub const fn is_windows() -> bool {
    cfg!(windows)
}

/// Gets the home directory path for the current user.
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined, with a
/// platform-specific hint about which environment variable to check.
pub fn get_home_dir() -> Result<PathBuf> {
    dirs::home_dir().ok_or_else(|| {
        let platform_help = if is_windows() {
            "On Windows: Check that the USERPROFILE environment variable is set"
        } else {
            "On Unix/Linux: Check that the HOME environment variable is set"
        };
        anyhow::anyhow!("Could not determine home directory.\n\n{platform_help}")
    })
}

/// Resolves a user-supplied path, expanding `~` and environment variables.
///
/// Only used while loading configuration at startup.
///
/// # Errors
///
/// Returns an error if a referenced environment variable is undefined.
pub fn resolve_path(path: &str) -> Result<PathBuf> {
    let expanded = shellexpand::full(path)
        .with_context(|| format!("Failed to expand path: {path}"))?;
    Ok(PathBuf::from(expanded.as_ref()))
}

/// Expands a leading `~` against an explicit home directory.
///
/// Unlike [`resolve_path`], this never reads the process environment, so the
/// caller decides where `~` points.
#[must_use]
pub fn expand_tilde(path: &str, home: Option<&Path>) -> PathBuf {
    PathBuf::from(
        shellexpand::tilde_with_context(path, || home.map(|h| h.to_string_lossy().into_owned()))
            .as_ref(),
    )
}

/// Platform identifier used in release archive names.
///
/// Releases are published per interpreter platform tag: `linux`, `darwin`, or
/// `win32`. Any other operating system uses its Rust target name.
#[must_use]
pub fn platform_identifier() -> &'static str {
    platform_identifier_for(std::env::consts::OS)
}

/// Maps a Rust target OS name to the release platform identifier.
#[must_use]
pub fn platform_identifier_for(os: &str) -> &str {
    match os {
        "macos" => "darwin",
        "windows" => "win32",
        other => other,
    }
}

/// Canonicalizes a path, returning a descriptive error on failure.
pub fn safe_canonicalize(path: &Path) -> Result<PathBuf> {
    path.canonicalize().with_context(|| {
        format!(
            "Failed to canonicalize path: {}\n\n\
                Possible causes:\n\
                - Path does not exist\n\
                - Permission denied",
            path.display()
        )
    })
}

/// Returns true if `path` is `base` or lies somewhere beneath it.
///
/// Both paths are canonicalized when they exist so that a home reached
/// through a symlink still contains its own executables. Windows comparisons
/// ignore case.
#[must_use]
pub fn is_nested_under(path: &Path, base: &Path) -> bool {
    let path = safe_canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    let base = safe_canonicalize(base).unwrap_or_else(|_| base.to_path_buf());

    if is_windows() {
        let path = path.to_string_lossy().to_lowercase();
        let base = base.to_string_lossy().to_lowercase();
        Path::new(&path).starts_with(Path::new(&base))
    } else {
        path.starts_with(&base)
    }
}
