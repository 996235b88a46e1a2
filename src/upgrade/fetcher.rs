//! Download, verification, and extraction of a release archive.
//!
//! [`ArchiveFetcher::fetch`] turns a selected [`Release`] into an
//! [`ExtractedTree`]: a verified, unpacked library tree inside a private
//! temporary directory. Nothing here touches the live installation; every
//! byte written lives under the temporary directory, which is removed when
//! the tree is dropped.
//!
//! # Request Sequence
//!
//! ```text
//! GET {base}/{tag}/{tool}-{tag}-{platform}.sha256sum   404 -> ChecksumMissing
//! GET {base}/{tag}/{tool}-{tag}-{platform}.tar.gz      404 -> ArchiveMissing
//!     stream to tempfile, SHA-256 over every chunk
//!     digest != checksum                               -> Integrity
//!     gunzip + untar into <tmp>/lib                    -> ArchiveCorrupt
//! ```

use futures::StreamExt;
use reqwest::StatusCode;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use super::archive::extract_tar_gz;
use super::release::Release;
use super::verification::{ChecksumVerifier, StreamingDigest};
use crate::config::UpdaterConfig;
use crate::core::UpdateError;
use crate::utils::platform::platform_identifier;
use crate::utils::progress::ProgressBar;

/// Byte counters of an archive download.
///
/// `bytes_expected` comes from `Content-Length` when the server sends it.
/// The counters are only ever observed; no decision depends on them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DownloadProgress {
    pub bytes_expected: Option<u64>,
    pub bytes_received: u64,
}

impl DownloadProgress {
    #[must_use]
    pub const fn new(bytes_expected: Option<u64>) -> Self {
        Self {
            bytes_expected,
            bytes_received: 0,
        }
    }

    pub const fn record(&mut self, bytes: u64) {
        self.bytes_received = self.bytes_received.saturating_add(bytes);
    }
}

/// A verified library tree awaiting installation.
///
/// Owns the temporary workspace; dropping the value deletes it.
#[derive(Debug)]
pub struct ExtractedTree {
    workspace: TempDir,
    root: PathBuf,
    release: Release,
    download: DownloadProgress,
}

impl ExtractedTree {
    /// Root of the unpacked library tree.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn workspace(&self) -> &Path {
        self.workspace.path()
    }

    pub const fn release(&self) -> &Release {
        &self.release
    }

    pub const fn download(&self) -> DownloadProgress {
        self.download
    }
}

/// Fetches release archives for one tool and platform.
#[derive(Debug, Clone)]
pub struct ArchiveFetcher {
    client: reqwest::Client,
    tool_name: String,
    platform: String,
    show_progress: bool,
}

impl ArchiveFetcher {
    /// Fetcher for `config.tool_name` on the running platform.
    pub fn new(config: &UpdaterConfig) -> Result<Self, UpdateError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| UpdateError::Transport {
                url: config.release_base_url.clone(),
                reason: e.to_string(),
            })?;
        Ok(Self::with_client(client, &config.tool_name))
    }

    pub fn with_client(client: reqwest::Client, tool_name: &str) -> Self {
        Self {
            client,
            tool_name: tool_name.to_string(),
            platform: platform_identifier().to_string(),
            show_progress: false,
        }
    }

    /// Override the platform identifier used in archive names.
    #[must_use]
    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = platform.into();
        self
    }

    /// Draw a progress bar while the archive downloads.
    #[must_use]
    pub const fn with_progress(mut self, enabled: bool) -> Self {
        self.show_progress = enabled;
        self
    }

    /// `{tool}-{tag}-{platform}` for `release`.
    pub fn archive_base_name(&self, release: &Release) -> String {
        release.archive_base_name(&self.tool_name, &self.platform)
    }

    /// Download, verify, and unpack `release` from `base_url`.
    ///
    /// # Errors
    ///
    /// [`UpdateError::ChecksumMissing`] / [`UpdateError::ArchiveMissing`] on
    /// 404, [`UpdateError::Transport`] on any other network failure,
    /// [`UpdateError::Integrity`] on digest mismatch, and
    /// [`UpdateError::ArchiveCorrupt`] when extraction fails. Requests are
    /// never retried.
    pub async fn fetch(&self, release: &Release, base_url: &str) -> Result<ExtractedTree, UpdateError> {
        let base_name = self.archive_base_name(release);
        let release_url = format!("{}/{}", base_url.trim_end_matches('/'), release.tag());

        let checksum_file = format!("{base_name}.sha256sum");
        let checksum_url = format!("{release_url}/{checksum_file}");
        let body = self
            .get(&checksum_url, || UpdateError::ChecksumMissing {
                file: checksum_file.clone(),
                url: checksum_url.clone(),
            })
            .await?
            .text()
            .await
            .map_err(|e| UpdateError::transport(&checksum_url, &e))?;
        let expected = ChecksumVerifier::parse_checksum(&body);
        debug!("Published checksum for {base_name}: {expected}");

        let workspace = tempfile::Builder::new()
            .prefix("selfup-updater-")
            .tempdir()
            .map_err(|e| UpdateError::io("create temporary directory", e))?;

        let archive_file = format!("{base_name}.tar.gz");
        let archive_url = format!("{release_url}/{archive_file}");
        let archive_path = workspace.path().join(&archive_file);
        let (actual, download) =
            self.download(&archive_url, &archive_file, &archive_path).await?;

        if let Err(e) = ChecksumVerifier::verify(&archive_file, &expected, &actual) {
            if let Err(cleanup) = tokio::fs::remove_file(&archive_path).await {
                debug!("Failed to discard {}: {cleanup}", archive_path.display());
            }
            return Err(e);
        }

        let root = workspace.path().join("lib");
        let extract_root = root.clone();
        let extract_archive = archive_path.clone();
        tokio::task::spawn_blocking(move || extract_tar_gz(&extract_archive, &extract_root))
            .await
            .map_err(|e| UpdateError::ArchiveCorrupt {
                archive: archive_file.clone(),
                reason: format!("extraction task failed: {e}"),
            })??;

        if let Err(e) = tokio::fs::remove_file(&archive_path).await {
            debug!("Failed to remove extracted archive {}: {e}", archive_path.display());
        }

        info!("Prepared {} in {}", release, root.display());
        Ok(ExtractedTree {
            workspace,
            root,
            release: release.clone(),
            download,
        })
    }

    async fn get(
        &self,
        url: &str,
        missing: impl FnOnce() -> UpdateError,
    ) -> Result<reqwest::Response, UpdateError> {
        debug!("GET {url}");
        let response =
            self.client.get(url).send().await.map_err(|e| UpdateError::transport(url, &e))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(missing());
        }
        if !status.is_success() {
            return Err(UpdateError::Transport {
                url: url.to_string(),
                reason: format!("HTTP {status}"),
            });
        }
        Ok(response)
    }

    /// Stream `url` into `path`, hashing every chunk as it is written.
    async fn download(
        &self,
        url: &str,
        file_name: &str,
        path: &Path,
    ) -> Result<(String, DownloadProgress), UpdateError> {
        let response = self
            .get(url, || UpdateError::ArchiveMissing {
                file: file_name.to_string(),
                url: url.to_string(),
            })
            .await?;

        let mut progress = DownloadProgress::new(response.content_length());
        let bar = ProgressBar::download(progress.bytes_expected, self.show_progress);
        bar.set_message(format!("Downloading {file_name}"));

        let mut file = tokio::fs::File::create(path)
            .await
            .map_err(|e| UpdateError::io(format!("create {}", path.display()), e))?;
        let mut digest = StreamingDigest::new();
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| UpdateError::transport(url, &e))?;
            file.write_all(&chunk)
                .await
                .map_err(|e| UpdateError::io(format!("write {}", path.display()), e))?;
            digest.update(&chunk);
            progress.record(chunk.len() as u64);
            bar.inc(chunk.len() as u64);
        }

        file.flush().await.map_err(|e| UpdateError::io(format!("flush {}", path.display()), e))?;
        bar.finish_and_clear();

        debug!("Downloaded {} bytes of {file_name}", digest.bytes());
        Ok((digest.finalize_hex(), progress))
    }
}
