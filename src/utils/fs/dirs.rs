//! Directory operations for creating, copying, moving, and removing trees.
//!
//! The installation swap is built entirely out of these primitives, so they
//! preserve what a runnable library tree needs: file modes, nested
//! directories, and symbolic links.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Ensures a directory exists, creating it and all parent directories if necessary.
///
/// # Errors
///
/// Returns an error if the path exists but is not a directory, or if creation fails.
///
/// # Examples
///
/// ```rust,no_run
/// use selfup_cli::utils::fs::ensure_dir;
/// use std::path::Path;
///
/// # fn example() -> anyhow::Result<()> {
/// ensure_dir(Path::new("/home/user/.poetry/bin"))?;
/// # Ok(())
/// # }
/// ```
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path).with_context(|| {
            let platform_help = if crate::utils::platform::is_windows() {
                "On Windows: Check that the path length is < 260 chars or that long path support is enabled"
            } else {
                "Check directory permissions and path validity"
            };

            format!("Failed to create directory: {}\n\n{}", path.display(), platform_help)
        })?;
    } else if !path.is_dir() {
        return Err(anyhow::anyhow!("Path exists but is not a directory: {}", path.display()));
    }
    Ok(())
}

/// Ensures that the parent directory of a file path exists.
pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    Ok(())
}

/// Recursively copies a directory tree to a new location.
///
/// Regular files are copied with their permissions. On Unix, symbolic links
/// are recreated as links rather than followed, so a copied tree behaves the
/// same as the original.
///
/// # Errors
///
/// Returns an error on the first file or directory that cannot be copied.
/// A partially written destination is left for the caller to clean up.
pub fn copy_dir(src: &Path, dst: &Path) -> Result<()> {
    ensure_dir(dst)?;

    for entry in
        fs::read_dir(src).with_context(|| format!("Failed to read directory: {}", src.display()))?
    {
        let entry = entry?;
        let file_type = entry.file_type()?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if file_type.is_dir() {
            copy_dir(&src_path, &dst_path)?;
        } else if file_type.is_file() {
            fs::copy(&src_path, &dst_path).with_context(|| {
                format!("Failed to copy file from {} to {}", src_path.display(), dst_path.display())
            })?;
        } else if file_type.is_symlink() {
            copy_symlink(&src_path, &dst_path)?;
        }
    }

    #[cfg(unix)]
    {
        let permissions = fs::metadata(src)
            .with_context(|| format!("Failed to read metadata: {}", src.display()))?
            .permissions();
        fs::set_permissions(dst, permissions)
            .with_context(|| format!("Failed to set permissions: {}", dst.display()))?;
    }

    Ok(())
}

#[cfg(unix)]
fn copy_symlink(src: &Path, dst: &Path) -> Result<()> {
    let target =
        fs::read_link(src).with_context(|| format!("Failed to read link: {}", src.display()))?;
    std::os::unix::fs::symlink(&target, dst)
        .with_context(|| format!("Failed to create link: {}", dst.display()))
}

#[cfg(not(unix))]
fn copy_symlink(src: &Path, dst: &Path) -> Result<()> {
    // Windows links need elevated rights to create; copy what they point at
    if src.is_dir() {
        copy_dir(src, dst)
    } else {
        fs::copy(src, dst)
            .map(|_| ())
            .with_context(|| format!("Failed to copy file from {} to {}", src.display(), dst.display()))
    }
}

/// Recursively removes a directory and all its contents.
///
/// A missing directory is not an error.
pub fn remove_dir_all(path: &Path) -> Result<()> {
    if path.symlink_metadata().is_ok() {
        fs::remove_dir_all(path)
            .with_context(|| format!("Failed to remove directory: {}", path.display()))?;
    }
    Ok(())
}

/// Moves a directory tree to `dst`, which must not exist yet.
///
/// Tries a rename first. When the rename fails (typically because the source
/// lives on another filesystem, such as the system temp directory), falls back
/// to copying the tree and deleting the source. If the copy fails, the partial
/// destination is removed before the error is returned.
pub fn move_dir(src: &Path, dst: &Path) -> Result<()> {
    if !src.is_dir() {
        return Err(anyhow::anyhow!("Source is not a directory: {}", src.display()));
    }

    let rename_error = match fs::rename(src, dst) {
        Ok(()) => return Ok(()),
        Err(e) => e,
    };
    tracing::debug!(
        "Rename {} -> {} failed ({rename_error}), copying instead",
        src.display(),
        dst.display()
    );

    if let Err(copy_error) = copy_dir(src, dst) {
        if let Err(cleanup_error) = remove_dir_all(dst) {
            tracing::warn!("Failed to clean up partial copy at {}: {cleanup_error}", dst.display());
        }
        return Err(copy_error);
    }

    // The tree is in place; a leftover source is only wasted space
    if let Err(e) = remove_dir_all(src) {
        tracing::warn!("Failed to remove moved source {}: {e}", src.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_ensure_dir() {
        let temp = tempdir().unwrap();
        let test_dir = temp.path().join("a").join("b");

        ensure_dir(&test_dir).unwrap();
        assert!(test_dir.is_dir());
        // Second call is a no-op
        ensure_dir(&test_dir).unwrap();
    }

    #[test]
    fn test_ensure_dir_on_file() {
        let temp = tempdir().unwrap();
        let file_path = temp.path().join("file.txt");
        std::fs::write(&file_path, "content").unwrap();

        assert!(ensure_dir(&file_path).is_err());
    }

    #[test]
    fn test_copy_dir_nested() {
        let temp = tempdir().unwrap();
        let src = temp.path().join("src");
        let dst = temp.path().join("dst");

        ensure_dir(&src.join("poetry/_vendor")).unwrap();
        std::fs::write(src.join("poetry/__init__.py"), "").unwrap();
        std::fs::write(src.join("poetry/_vendor/six.py"), "six").unwrap();

        copy_dir(&src, &dst).unwrap();

        assert!(dst.join("poetry/__init__.py").exists());
        assert_eq!(std::fs::read_to_string(dst.join("poetry/_vendor/six.py")).unwrap(), "six");
    }

    #[cfg(unix)]
    #[test]
    fn test_copy_dir_preserves_modes_and_links() {
        use std::os::unix::fs::PermissionsExt;

        let temp = tempdir().unwrap();
        let src = temp.path().join("src");
        let dst = temp.path().join("dst");
        ensure_dir(&src).unwrap();

        let tool = src.join("tool.sh");
        std::fs::write(&tool, "#!/bin/sh\n").unwrap();
        std::fs::set_permissions(&tool, std::fs::Permissions::from_mode(0o755)).unwrap();
        std::os::unix::fs::symlink("tool.sh", src.join("tool")).unwrap();

        copy_dir(&src, &dst).unwrap();

        let mode = std::fs::metadata(dst.join("tool.sh")).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
        let link = std::fs::read_link(dst.join("tool")).unwrap();
        assert_eq!(link, std::path::PathBuf::from("tool.sh"));
    }

    #[test]
    fn test_remove_dir_all_missing_is_ok() {
        let temp = tempdir().unwrap();
        remove_dir_all(&temp.path().join("missing")).unwrap();
    }

    #[test]
    fn test_move_dir() {
        let temp = tempdir().unwrap();
        let src = temp.path().join("new-lib");
        let dst = temp.path().join("lib");
        ensure_dir(&src).unwrap();
        std::fs::write(src.join("marker"), "2.0").unwrap();

        move_dir(&src, &dst).unwrap();

        assert!(!src.exists());
        assert_eq!(std::fs::read_to_string(dst.join("marker")).unwrap(), "2.0");
    }

    #[test]
    fn test_move_dir_missing_source_fails_without_creating_destination() {
        let temp = tempdir().unwrap();
        let dst = temp.path().join("lib");

        assert!(move_dir(&temp.path().join("missing"), &dst).is_err());
        assert!(!dst.exists());
    }
}
