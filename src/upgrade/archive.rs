//! Gzip-compressed tar extraction for release archives.

use flate2::read::GzDecoder;
use std::fs::File;
use std::path::Path;
use tar::Archive;

use crate::core::UpdateError;

/// Unpack `archive` into `destination`, preserving file modes.
///
/// Blocking; callers on the async runtime run it through
/// `tokio::task::spawn_blocking`. Entries whose path would land outside
/// `destination` (absolute paths, `..` components) abort the extraction.
///
/// # Errors
///
/// Returns [`UpdateError::ArchiveCorrupt`] for truncated or malformed data and
/// for escaping entries, [`UpdateError::Io`] when the archive cannot be opened.
pub fn extract_tar_gz(archive: &Path, destination: &Path) -> Result<(), UpdateError> {
    let archive_name = archive
        .file_name()
        .map_or_else(|| archive.display().to_string(), |n| n.to_string_lossy().into_owned());
    let corrupt = |reason: String| UpdateError::ArchiveCorrupt {
        archive: archive_name.clone(),
        reason,
    };

    let file = File::open(archive)
        .map_err(|e| UpdateError::io(format!("open {}", archive.display()), e))?;
    std::fs::create_dir_all(destination)
        .map_err(|e| UpdateError::io(format!("create {}", destination.display()), e))?;

    let mut tar = Archive::new(GzDecoder::new(file));
    tar.set_preserve_permissions(true);
    tar.set_preserve_mtime(true);
    tar.set_overwrite(true);

    let mut unpacked = 0usize;
    for entry in tar.entries().map_err(|e| corrupt(e.to_string()))? {
        let mut entry = entry.map_err(|e| corrupt(e.to_string()))?;
        let entry_path =
            entry.path().map_err(|e| corrupt(e.to_string()))?.display().to_string();

        let inside = entry
            .unpack_in(destination)
            .map_err(|e| corrupt(format!("failed to unpack {entry_path}: {e}")))?;
        if !inside {
            return Err(corrupt(format!("entry {entry_path} escapes the extraction directory")));
        }
        unpacked += 1;
    }

    tracing::debug!("Extracted {unpacked} entries from {archive_name} into {}", destination.display());
    Ok(())
}
