//! File system utilities for the installation tree
//!
//! All functions work consistently across Windows, macOS, and Linux and return
//! `anyhow` errors with the offending path in their context.
//!
//! # Examples
//!
//! ```rust,no_run
//! use selfup_cli::utils::fs::{copy_dir, ensure_dir, move_dir};
//! use std::path::Path;
//!
//! # fn example() -> anyhow::Result<()> {
//! ensure_dir(Path::new("/home/user/.poetry"))?;
//! copy_dir(Path::new("/home/user/.poetry/lib"), Path::new("/home/user/.poetry/lib-backup"))?;
//! move_dir(Path::new("/tmp/selfup-updater-x/lib"), Path::new("/home/user/.poetry/lib"))?;
//! # Ok(())
//! # }
//! ```
//!
//! # Platform Considerations
//!
//! ## Unix/Linux
//! - Preserves file permissions during copy operations
//! - Recreates symbolic links instead of following them
//!
//! ## Windows
//! - Symbolic links are copied as the files they point to

pub mod atomic;
pub mod dirs;

pub use atomic::{atomic_write, safe_write};
pub use dirs::{copy_dir, ensure_dir, ensure_parent_dir, move_dir, remove_dir_all};
