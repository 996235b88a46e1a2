//! selfup - self-updating installer for launcher-bootstrapped tools
//!
//! Updates a command-line tool that is installed as a library tree plus a
//! launcher script, replacing its runtime files while it runs from them and
//! never leaving a half-installed tool behind.
//!
//! # Architecture Overview
//!
//! An installation lives under one home directory:
//! - `lib/` holds the tool's modules and vendored dependencies
//! - `bin/<tool>` is a launcher that puts `lib/` on the interpreter path
//! - `lib-backup/` exists only while an update is replacing `lib/`
//!
//! An update selects a release from the catalog, downloads its archive,
//! verifies the archive's SHA-256 against the published checksum, unpacks it
//! into a temporary directory, swaps it in with a full backup of the previous
//! tree, and finally regenerates the launcher.
//!
//! # Core Modules
//!
//! - [`cli`] - Command-line interface (`selfup self-update`)
//! - [`config`] - `~/.selfup/config.toml` with Poetry-layout defaults
//! - [`core`] - Error taxonomy and user-facing error reports
//! - [`upgrade`] - Selection, fetch, swap, launcher, and orchestration
//! - [`utils`] - File system, platform, and progress helpers
//!
//! # Configuration (`~/.selfup/config.toml`)
//!
//! ```toml
//! tool_name = "poetry"
//! home_env = "POETRY_HOME"
//! default_home = "~/.poetry"
//! release_base_url = "https://github.com/python-poetry/poetry/releases/download"
//! catalog_url = "https://pypi.org/pypi"
//! entry_module = "poetry.console"
//! request_timeout_secs = 300
//! ```
//!
//! # Exit Status
//!
//! `0` when the tool was updated, is already current, or no matching release
//! exists; `1` on any failure.

pub mod cli;
pub mod config;
pub mod core;
pub mod upgrade;
pub mod utils;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
