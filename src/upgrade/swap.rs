//! Crash-safe replacement of the live library tree.
//!
//! [`InstallationSwapper::swap`] runs backup, replace, and finalize over
//! `lib/`. Every step returns a `Result`, and a failure while the live tree is
//! being replaced is answered by an explicit restore from `lib-backup/` before
//! the error is returned.
//!
//! # Swap Sequence
//!
//! 1. Discard a stale `lib-backup/` left by an interrupted run
//! 2. Copy `lib/` to `lib-backup/` in full, then remove `lib/`
//! 3. Move the new tree into `lib/` (rename, or copy across filesystems)
//! 4. On failure in 2 or 3: copy `lib-backup/` back to `lib/`
//! 5. Remove `lib-backup/`
//!
//! After `swap` returns, either the new tree or the original tree is live and
//! no backup remains. The only exception is [`UpdateError::RestoreFailed`],
//! which leaves the backup in place and names it.

use std::path::Path;
use tracing::{debug, info, warn};

use super::layout::InstallationLayout;
use crate::core::UpdateError;
use crate::utils::fs::{copy_dir, move_dir, remove_dir_all};

/// Performs the backup, replace, restore sequence over one layout.
///
/// All operations block; the orchestrator runs them on the blocking pool
/// while holding the [`UpdateLock`](super::UpdateLock).
pub struct InstallationSwapper<'a> {
    layout: &'a InstallationLayout,
}

impl<'a> InstallationSwapper<'a> {
    pub const fn new(layout: &'a InstallationLayout) -> Self {
        Self {
            layout,
        }
    }

    /// Install `new_tree` as the live library directory.
    ///
    /// `new_tree` is consumed: on success it no longer exists at its old path.
    ///
    /// # Errors
    ///
    /// - [`UpdateError::Swap`] when the swap failed and the original tree is
    ///   live again (or there was no original tree)
    /// - [`UpdateError::RestoreFailed`] when restoring the original tree failed
    pub fn swap(&self, new_tree: &Path) -> Result<(), UpdateError> {
        self.discard_stale_backup()?;
        let backed_up = self.create_backup()?;

        match self.remove_live().and_then(|()| self.install(new_tree)) {
            Ok(()) => {
                self.finalize();
                info!("Installed new library tree at {}", self.layout.lib_dir().display());
                Ok(())
            }
            Err(error) => {
                warn!("Swap failed: {error}");
                if backed_up {
                    self.restore(&error)?;
                    info!("Restored previous installation at {}", self.layout.lib_dir().display());
                }
                Err(error)
            }
        }
    }

    fn discard_stale_backup(&self) -> Result<(), UpdateError> {
        let backup = self.layout.backup_dir();
        if backup.symlink_metadata().is_ok() {
            debug!("Removing stale backup at {}", backup.display());
            remove_dir_all(backup).map_err(|e| swap_error("remove stale backup", &e))?;
        }
        Ok(())
    }

    /// Copy the live tree to the backup location.
    ///
    /// Returns false when there is no live tree to back up. A failed copy is
    /// cleaned up and leaves the live tree untouched.
    fn create_backup(&self) -> Result<bool, UpdateError> {
        let lib = self.layout.lib_dir();
        let backup = self.layout.backup_dir();
        if !lib.exists() {
            debug!("No live library at {}, nothing to back up", lib.display());
            return Ok(false);
        }

        info!("Backing up {} to {}", lib.display(), backup.display());
        if let Err(e) = copy_dir(lib, backup) {
            if let Err(cleanup) = remove_dir_all(backup) {
                warn!("Failed to remove partial backup {}: {cleanup}", backup.display());
            }
            return Err(swap_error("back up the current installation", &e));
        }
        Ok(true)
    }

    fn remove_live(&self) -> Result<(), UpdateError> {
        remove_dir_all(self.layout.lib_dir())
            .map_err(|e| swap_error("remove the current library tree", &e))
    }

    fn install(&self, new_tree: &Path) -> Result<(), UpdateError> {
        debug!("Moving {} into {}", new_tree.display(), self.layout.lib_dir().display());
        move_dir(new_tree, self.layout.lib_dir())
            .map_err(|e| swap_error("install the new library tree", &e))
    }

    /// Put the backup back in place of a partial or missing live tree.
    fn restore(&self, cause: &UpdateError) -> Result<(), UpdateError> {
        let lib = self.layout.lib_dir();
        let backup = self.layout.backup_dir();
        warn!("Restoring previous installation from {}", backup.display());

        let restore_failed = |e: anyhow::Error| UpdateError::RestoreFailed {
            backup: backup.to_path_buf(),
            reason: format!("{e:#}"),
            cause: cause.to_string(),
        };

        remove_dir_all(lib).map_err(restore_failed)?;
        if let Err(e) = copy_dir(backup, lib) {
            return Err(restore_failed(e));
        }
        if let Err(e) = remove_dir_all(backup) {
            warn!("Previous installation restored but {} remains: {e:#}", backup.display());
        }
        Ok(())
    }

    fn finalize(&self) {
        // The new tree is already live; a leftover backup is removed on the next run
        if let Err(e) = remove_dir_all(self.layout.backup_dir()) {
            warn!("Failed to remove backup {}: {e:#}", self.layout.backup_dir().display());
        }
    }
}

fn swap_error(operation: &str, error: &anyhow::Error) -> UpdateError {
    UpdateError::Swap {
        operation: operation.to_string(),
        reason: format!("{error:#}"),
    }
}
