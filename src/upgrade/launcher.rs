//! Launcher scripts that bootstrap the tool from the installed library tree.
//!
//! The launcher is a small Python script in `bin/`. It prepends `lib/` and the
//! vendored dependency directory for the running interpreter version to the
//! module search path, then calls the tool's entry point. Windows gets an
//! extra `.bat` wrapper, since scripts without an extension cannot be run
//! directly there.
//!
//! The interpreter written into the launcher is found by probing a list of
//! candidate commands through a [`VersionProbe`], so resolution can be tested
//! without real interpreters.

use regex::Regex;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::LazyLock;
use tracing::{debug, info};

use super::layout::InstallationLayout;
use crate::core::UpdateError;
use crate::utils::fs::{ensure_dir, safe_write};

/// Interpreter used when no candidate could be run.
pub const DEFAULT_INTERPRETER: &str = "python";

static INTERPRETER_VERSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Python (\d+)\.(\d+)\.(\d+)")
        .unwrap_or_else(|e| unreachable!("invalid interpreter pattern: {e}"))
});

/// Launcher flavor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Posix,
    Windows,
}

impl Platform {
    /// Flavor of the running system.
    #[must_use]
    pub const fn current() -> Self {
        if cfg!(windows) { Self::Windows } else { Self::Posix }
    }
}

/// Interpreter version reported by `--version`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterpreterVersion {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

/// Extract `Python <major>.<minor>.<patch>` from `--version` output.
///
/// ```rust
/// use selfup_cli::upgrade::launcher::parse_interpreter_version;
///
/// let version = parse_interpreter_version("Python 3.8.10\n").unwrap();
/// assert_eq!((version.major, version.minor, version.patch), (3, 8, 10));
/// assert!(parse_interpreter_version("command not found").is_none());
/// ```
#[must_use]
pub fn parse_interpreter_version(output: &str) -> Option<InterpreterVersion> {
    let caps = INTERPRETER_VERSION.captures(output)?;
    Some(InterpreterVersion {
        major: caps[1].parse().ok()?,
        minor: caps[2].parse().ok()?,
        patch: caps[3].parse().ok()?,
    })
}

/// One interpreter command to try, such as `python3` or `py.exe -3`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub program: String,
    pub args: Vec<String>,
}

impl Candidate {
    /// Split a command line on whitespace into program and arguments.
    #[must_use]
    pub fn parse(command_line: &str) -> Self {
        let mut parts = command_line.split_whitespace().map(str::to_string);
        Self {
            program: parts.next().unwrap_or_default(),
            args: parts.collect(),
        }
    }

    /// The command as written into the launcher.
    #[must_use]
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Runs a candidate with `--version`.
pub trait VersionProbe {
    /// Combined output of a successful run, or `None` if the candidate is
    /// missing or exits unsuccessfully.
    fn query_version(&self, candidate: &Candidate) -> Option<String>;
}

/// Probe that runs candidates as real processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandProbe;

impl VersionProbe for CommandProbe {
    fn query_version(&self, candidate: &Candidate) -> Option<String> {
        let program = which::which(&candidate.program).ok()?;
        let output = Command::new(program).args(&candidate.args).arg("--version").output().ok()?;
        if !output.status.success() {
            return None;
        }

        // Older interpreters print their version to stderr
        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));
        Some(text)
    }
}

/// Picks the interpreter written into the launcher.
pub struct ExecutableResolver<P> {
    candidates: Vec<Candidate>,
    probe: P,
}

impl<P: VersionProbe> ExecutableResolver<P> {
    /// Standard candidates for `platform`.
    ///
    /// POSIX: `python`, `python3`. Windows additionally tries the `py.exe`
    /// launcher for Python 3, then Python 2.
    pub fn for_platform(platform: Platform, probe: P) -> Self {
        let mut candidates = vec![Candidate::parse("python"), Candidate::parse("python3")];
        if platform == Platform::Windows {
            candidates.push(Candidate::parse("py.exe -3"));
            candidates.push(Candidate::parse("py.exe -2"));
        }
        Self::with_candidates(candidates, probe)
    }

    pub const fn with_candidates(candidates: Vec<Candidate>, probe: P) -> Self {
        Self {
            candidates,
            probe,
        }
    }

    /// Probe candidates in order.
    ///
    /// The first candidate reporting Python 3 or newer wins. Otherwise the
    /// first candidate that ran at all is used, and [`DEFAULT_INTERPRETER`]
    /// when none did.
    pub fn resolve(&self) -> String {
        let mut fallback: Option<&Candidate> = None;

        for candidate in &self.candidates {
            let Some(output) = self.probe.query_version(candidate) else {
                debug!("Interpreter candidate {} did not run", candidate.command_line());
                continue;
            };

            match parse_interpreter_version(&output) {
                Some(version) if version.major >= 3 => {
                    debug!(
                        "Using {} (Python {}.{}.{})",
                        candidate.command_line(),
                        version.major,
                        version.minor,
                        version.patch
                    );
                    return candidate.command_line();
                }
                _ => {
                    fallback.get_or_insert(candidate);
                }
            }
        }

        fallback.map_or_else(|| DEFAULT_INTERPRETER.to_string(), Candidate::command_line)
    }
}

/// Everything needed to write a launcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LauncherSpec {
    pub interpreter: String,
    pub script_path: PathBuf,
    pub platform: Platform,
}

impl LauncherSpec {
    /// Path of the Windows `.bat` wrapper next to the script.
    #[must_use]
    pub fn batch_path(&self) -> PathBuf {
        self.script_path.with_extension("bat")
    }
}

/// Writes the launcher scripts for one tool.
#[derive(Debug, Clone)]
pub struct LauncherGenerator {
    tool_name: String,
    entry_module: String,
    platform: Platform,
    user_home: Option<PathBuf>,
}

impl LauncherGenerator {
    pub fn new(tool_name: impl Into<String>, entry_module: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
            entry_module: entry_module.into(),
            platform: Platform::current(),
            user_home: None,
        }
    }

    #[must_use]
    pub const fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    /// Home directory replaced by `%USERPROFILE%` in the Windows wrapper.
    #[must_use]
    pub fn with_user_home(mut self, user_home: Option<PathBuf>) -> Self {
        self.user_home = user_home;
        self
    }

    /// Launcher description for `layout` and `interpreter`.
    pub fn spec(&self, layout: &InstallationLayout, interpreter: &str) -> LauncherSpec {
        LauncherSpec {
            interpreter: interpreter.to_string(),
            script_path: layout.bin_dir().join(&self.tool_name),
            platform: self.platform,
        }
    }

    /// Regenerate the launcher(s) in `layout.bin_dir()`.
    ///
    /// Existing launchers are replaced wholesale.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::Launcher`] if a file cannot be written or made
    /// executable.
    pub fn generate(
        &self,
        layout: &InstallationLayout,
        interpreter: &str,
    ) -> Result<LauncherSpec, UpdateError> {
        let spec = self.spec(layout, interpreter);
        let launcher_error = |path: &Path, e: anyhow::Error| UpdateError::Launcher {
            path: path.to_path_buf(),
            reason: format!("{e:#}"),
        };

        ensure_dir(layout.bin_dir()).map_err(|e| launcher_error(layout.bin_dir(), e))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(layout.bin_dir(), std::fs::Permissions::from_mode(0o755))
                .map_err(|e| launcher_error(layout.bin_dir(), e.into()))?;
        }

        safe_write(&spec.script_path, &self.render_script(&spec))
            .map_err(|e| launcher_error(&spec.script_path, e))?;

        match spec.platform {
            Platform::Posix => set_executable(&spec.script_path)?,
            Platform::Windows => {
                let batch = spec.batch_path();
                safe_write(&batch, &self.render_batch_wrapper(&spec))
                    .map_err(|e| launcher_error(&batch, e))?;
            }
        }

        info!("Wrote launcher {} using {}", spec.script_path.display(), spec.interpreter);
        Ok(spec)
    }

    /// Python bootstrap script for `spec`.
    pub fn render_script(&self, spec: &LauncherSpec) -> String {
        let mut script = String::new();
        if spec.platform == Platform::Posix {
            script.push_str(&format!("#!/usr/bin/env {}\n", spec.interpreter));
        }
        script.push_str(&format!(
            r#"# -*- coding: utf-8 -*-
import os
import sys

lib = os.path.normpath(os.path.join(os.path.realpath(__file__), "../..", "lib"))
vendors = os.path.join(lib, "{tool}", "_vendor")
current_vendors = os.path.join(vendors, "py%d.%d" % sys.version_info[:2])

sys.path.insert(0, lib)
if os.path.isdir(current_vendors):
    sys.path.insert(0, current_vendors)

if __name__ == "__main__":
    from {entry_module} import main

    main()
"#,
            tool = self.tool_name,
            entry_module = self.entry_module,
        ));
        script
    }

    /// Windows wrapper forwarding all arguments to the script.
    pub fn render_batch_wrapper(&self, spec: &LauncherSpec) -> String {
        let mut script_path = spec.script_path.display().to_string();
        if let Some(home) = &self.user_home {
            script_path = script_path.replace(&home.display().to_string(), "%USERPROFILE%");
        }
        format!("@echo off\r\n{} \"{script_path}\" %*\r\n", spec.interpreter)
    }
}

/// Add the execute bits to `path`.
///
/// A no-op on platforms without Unix permissions.
///
/// # Errors
///
/// Returns [`UpdateError::Launcher`] if the permissions cannot be changed.
pub fn set_executable(path: &Path) -> Result<(), UpdateError> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        let launcher_error = |e: std::io::Error| UpdateError::Launcher {
            path: path.to_path_buf(),
            reason: e.to_string(),
        };
        let mut permissions = std::fs::metadata(path).map_err(launcher_error)?.permissions();
        permissions.set_mode(permissions.mode() | 0o111);
        std::fs::set_permissions(path, permissions).map_err(launcher_error)?;
    }
    #[cfg(not(unix))]
    let _ = path;
    Ok(())
}
