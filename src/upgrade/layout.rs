//! On-disk layout of a managed installation.

use regex::Regex;
use semver::Version;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use super::release::parse_release_version;
use crate::config::UpdaterConfig;
use crate::utils::platform::{expand_tilde, is_nested_under};

/// Name of the advisory lock file inside the installation home.
pub const LOCK_FILE_NAME: &str = ".selfup.lock";

/// Name of the module holding the installed version inside `lib/<tool>/`.
pub const VERSION_FILE_NAME: &str = "__version__.py";

static VERSION_ASSIGNMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^__version__\s*=\s*["']([^"']+)["']"#)
        .unwrap_or_else(|e| unreachable!("invalid version assignment pattern: {e}"))
});

/// Directories of one installation, resolved once at startup.
///
/// ```text
/// <home>/
/// ├── bin/            launcher scripts
/// ├── lib/            live library tree
/// ├── lib-backup/     previous tree, only while a swap is in progress
/// └── .selfup.lock    held during the swap and launcher regeneration
/// ```
///
/// Outside a swap, at most one of `lib/` and `lib-backup/` is the live tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallationLayout {
    home: PathBuf,
    bin: PathBuf,
    lib: PathBuf,
    lib_backup: PathBuf,
}

impl InstallationLayout {
    /// Layout rooted at `home`.
    pub fn new(home: impl Into<PathBuf>) -> Self {
        let home = home.into();
        Self {
            bin: home.join("bin"),
            lib: home.join("lib"),
            lib_backup: home.join("lib-backup"),
            home,
        }
    }

    /// Resolve the layout from configuration and an injected variable lookup.
    ///
    /// The home comes from the variable named by `config.home_env` when it is
    /// set and non-empty, otherwise from `config.default_home`. A leading `~`
    /// expands to `user_home`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use selfup_cli::config::UpdaterConfig;
    /// use selfup_cli::upgrade::InstallationLayout;
    /// use std::path::Path;
    ///
    /// let config = UpdaterConfig::default();
    /// let layout = InstallationLayout::resolve(&config, |_| None, Some(Path::new("/home/alice")));
    /// assert_eq!(layout.lib_dir(), Path::new("/home/alice/.poetry/lib"));
    ///
    /// let layout = InstallationLayout::resolve(
    ///     &config,
    ///     |key| (key == "POETRY_HOME").then(|| "/opt/poetry".to_string()),
    ///     None,
    /// );
    /// assert_eq!(layout.home(), Path::new("/opt/poetry"));
    /// ```
    pub fn resolve<F>(config: &UpdaterConfig, lookup: F, user_home: Option<&Path>) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw = lookup(&config.home_env)
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| config.default_home.clone());
        let home = expand_tilde(raw.trim(), user_home);
        tracing::debug!("Resolved installation home: {}", home.display());
        Self::new(home)
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    pub fn bin_dir(&self) -> &Path {
        &self.bin
    }

    pub fn lib_dir(&self) -> &Path {
        &self.lib
    }

    pub fn backup_dir(&self) -> &Path {
        &self.lib_backup
    }

    pub fn lock_path(&self) -> PathBuf {
        self.home.join(LOCK_FILE_NAME)
    }

    /// Path of the version marker of `tool` in the live tree.
    pub fn version_file(&self, tool: &str) -> PathBuf {
        self.lib.join(tool).join(VERSION_FILE_NAME)
    }

    /// Version of `tool` currently installed in `lib/`.
    ///
    /// Read from the `__version__ = "..."` assignment of the version marker.
    /// Returns `None` when the file is missing or holds no parsable version.
    pub fn installed_version(&self, tool: &str) -> Option<Version> {
        let path = self.version_file(tool);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                tracing::debug!("No installed version at {}: {e}", path.display());
                return None;
            }
        };

        let version = VERSION_ASSIGNMENT
            .captures(&content)
            .and_then(|caps| parse_release_version(&caps[1]));
        match &version {
            Some(version) => tracing::debug!("Installed {tool} version: {version}"),
            None => tracing::debug!("Unparsable version marker {}", path.display()),
        }
        version
    }

    /// Whether `path` lies inside the installation home.
    #[must_use]
    pub fn contains(&self, path: &Path) -> bool {
        is_nested_under(path, &self.home)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_derives_directories() {
        let layout = InstallationLayout::new("/home/alice/.poetry");
        assert_eq!(layout.bin_dir(), Path::new("/home/alice/.poetry/bin"));
        assert_eq!(layout.lib_dir(), Path::new("/home/alice/.poetry/lib"));
        assert_eq!(layout.backup_dir(), Path::new("/home/alice/.poetry/lib-backup"));
        assert_eq!(layout.lock_path(), PathBuf::from("/home/alice/.poetry/.selfup.lock"));
    }

    #[test]
    fn test_resolve_ignores_empty_override() {
        let config = UpdaterConfig::default();
        let layout =
            InstallationLayout::resolve(&config, |_| Some("  ".to_string()), Some(Path::new("/u")));
        assert_eq!(layout.home(), Path::new("/u/.poetry"));
    }

    #[test]
    fn test_resolve_uses_configured_variable() {
        let config = UpdaterConfig {
            home_env: "MYTOOL_HOME".to_string(),
            ..UpdaterConfig::default()
        };
        let layout = InstallationLayout::resolve(
            &config,
            |key| match key {
                "MYTOOL_HOME" => Some("~/tools/mytool".to_string()),
                _ => Some("/wrong".to_string()),
            },
            Some(Path::new("/u")),
        );
        assert_eq!(layout.home(), Path::new("/u/tools/mytool"));
    }

    #[test]
    fn test_installed_version_reads_marker() {
        let temp = tempfile::tempdir().unwrap();
        let layout = InstallationLayout::new(temp.path());
        let marker = layout.version_file("poetry");
        std::fs::create_dir_all(marker.parent().unwrap()).unwrap();

        std::fs::write(&marker, "# generated\n__version__ = \"1.2.0\"\n").unwrap();
        assert_eq!(layout.installed_version("poetry"), Some(Version::new(1, 2, 0)));

        std::fs::write(&marker, "__version__ = '1.3.0a1'\n").unwrap();
        let version = layout.installed_version("poetry").unwrap();
        assert_eq!((version.major, version.minor, version.patch), (1, 3, 0));
        assert!(!version.pre.is_empty());
    }

    #[test]
    fn test_installed_version_missing_or_garbage() {
        let temp = tempfile::tempdir().unwrap();
        let layout = InstallationLayout::new(temp.path());
        assert_eq!(layout.installed_version("poetry"), None);

        let marker = layout.version_file("poetry");
        std::fs::create_dir_all(marker.parent().unwrap()).unwrap();
        std::fs::write(&marker, "VERSION = 3\n").unwrap();
        assert_eq!(layout.installed_version("poetry"), None);
    }

    #[test]
    fn test_contains_executable_under_bin() {
        let temp = tempfile::tempdir().unwrap();
        let layout = InstallationLayout::new(temp.path().join(".poetry"));
        std::fs::create_dir_all(layout.bin_dir()).unwrap();
        let exe = layout.bin_dir().join("poetry");
        std::fs::write(&exe, "").unwrap();

        assert!(layout.contains(&exe));
        assert!(!layout.contains(temp.path()));
    }
}
