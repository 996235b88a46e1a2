//! Cross-platform utilities for the updater
//!
//! # Modules
//!
//! - [`fs`] - Directory copy, move, and atomic write primitives used by the swap
//! - [`platform`] - Home directory, tilde expansion, and platform identifiers
//! - [`progress`] - Download progress bars with caller-controlled visibility

pub mod fs;
pub mod platform;
pub mod progress;

pub use fs::{atomic_write, copy_dir, ensure_dir, move_dir, remove_dir_all, safe_write};
pub use platform::{get_home_dir, is_windows, platform_identifier, resolve_path};
pub use progress::ProgressBar;
