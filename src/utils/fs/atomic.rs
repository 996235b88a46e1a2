//! Atomic file write operations using temp-and-rename strategy.
//!
//! Launcher scripts are written this way so a shell that starts the launcher
//! mid-update never sees a half-written file.

use crate::utils::fs::dirs::ensure_parent_dir;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Safely writes a string to a file using atomic operations.
pub fn safe_write(path: &Path, content: &str) -> Result<()> {
    atomic_write(path, content.as_bytes())
}

/// Atomically writes bytes to a file using a write-then-rename strategy.
///
/// 1. Writes content to a sibling temporary file
/// 2. Syncs the temporary file to disk
/// 3. Renames the temporary file over the target path
///
/// The target is replaced as a new file, so it does not inherit the
/// permissions of whatever was there before. On failure the temporary file
/// is removed and the target is left as it was.
///
/// # Examples
///
/// ```rust,no_run
/// use selfup_cli::utils::fs::atomic_write;
/// use std::path::Path;
///
/// # fn example() -> anyhow::Result<()> {
/// atomic_write(Path::new("/home/user/.poetry/bin/poetry"), b"#!/usr/bin/env python\n")?;
/// # Ok(())
/// # }
/// ```
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    ensure_parent_dir(path)?;

    let file_name = path
        .file_name()
        .with_context(|| format!("Not a file path: {}", path.display()))?;
    let mut temp_name = file_name.to_os_string();
    temp_name.push(".tmp");
    let temp_path = path.with_file_name(temp_name);

    let result = write_synced(&temp_path, content).and_then(|()| {
        fs::rename(&temp_path, path)
            .with_context(|| format!("Failed to rename temp file to: {}", path.display()))
    });

    if result.is_err()
        && temp_path.exists()
        && let Err(e) = fs::remove_file(&temp_path)
    {
        tracing::warn!("Failed to remove temp file {}: {e}", temp_path.display());
    }
    result
}

fn write_synced(temp_path: &Path, content: &[u8]) -> Result<()> {
    use std::io::Write;

    let mut file = fs::File::create(temp_path).with_context(|| {
        let platform_help = if crate::utils::platform::is_windows() {
            "On Windows: Check file permissions, path length, and that directory exists"
        } else {
            "Check file permissions and that directory exists"
        };

        format!("Failed to create temp file: {}\n\n{}", temp_path.display(), platform_help)
    })?;

    file.write_all(content)
        .with_context(|| format!("Failed to write to temp file: {}", temp_path.display()))?;

    file.sync_all().with_context(|| "Failed to sync file to disk")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_atomic_write_creates_parents() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("bin").join("poetry");

        atomic_write(&path, b"launcher").unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"launcher");
        assert!(!temp.path().join("bin").join("poetry.tmp").exists());
    }

    #[test]
    fn test_failed_write_removes_temp_file() {
        let temp = tempdir().unwrap();
        // A non-empty directory cannot be replaced by a file
        let path = temp.path().join("poetry");
        std::fs::create_dir_all(path.join("occupied")).unwrap();

        assert!(atomic_write(&path, b"launcher").is_err());

        assert!(!temp.path().join("poetry.tmp").exists());
        assert!(path.join("occupied").is_dir());
    }

    #[test]
    fn test_safe_write_replaces_existing() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("poetry.bat");
        std::fs::write(&path, "old").unwrap();

        safe_write(&path, "new").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "new");
    }
}
