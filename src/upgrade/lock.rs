//! Advisory lock serializing updates of one installation.
//!
//! Two concurrent `self-update` runs against the same home would both back up
//! and replace `lib/`. The orchestrator holds an [`UpdateLock`] across the swap
//! and launcher regeneration so the second run waits until the first is done.

use fs4::fs_std::FileExt;
use std::fs::{File, OpenOptions};
use std::path::PathBuf;

use super::layout::InstallationLayout;
use crate::core::UpdateError;

/// Exclusive file lock on `<home>/.selfup.lock`.
///
/// The lock is released when the value is dropped.
#[derive(Debug)]
pub struct UpdateLock {
    file: File,
    path: PathBuf,
}

impl UpdateLock {
    /// Acquire the lock for `layout`, waiting while another process holds it.
    ///
    /// The blocking lock call runs on the blocking thread pool.
    pub async fn acquire(layout: &InstallationLayout) -> Result<Self, UpdateError> {
        let path = layout.lock_path();
        let lock_path = path.clone();

        let file = tokio::task::spawn_blocking(move || -> Result<File, UpdateError> {
            let lock_error = |e: std::io::Error| UpdateError::Lock {
                path: lock_path.clone(),
                reason: e.to_string(),
            };

            let file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&lock_path)
                .map_err(lock_error)?;

            file.lock_exclusive().map_err(lock_error)?;
            Ok(file)
        })
        .await
        .map_err(|e| UpdateError::Lock {
            path: path.clone(),
            reason: format!("lock task failed: {e}"),
        })??;

        tracing::debug!("Acquired update lock {}", path.display());
        Ok(Self {
            file,
            path,
        })
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl Drop for UpdateLock {
    fn drop(&mut self) {
        #[allow(unstable_name_collisions)]
        if let Err(e) = self.file.unlock() {
            tracing::warn!("Failed to unlock {}: {}", self.path.display(), e);
        }
    }
}
