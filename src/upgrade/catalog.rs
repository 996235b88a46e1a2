//! Release catalogs: where candidate releases come from.
//!
//! [`ReleaseCatalog`] is the seam between the updater and whatever publishes
//! version listings. [`PypiCatalog`] queries a PyPI-compatible JSON API and
//! [`StaticCatalog`] serves a fixed list (tests, mirrors, pinned channels).

use reqwest::StatusCode;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::future::Future;

use super::release::{Release, ReleaseConstraint};
use crate::config::UpdaterConfig;
use crate::core::UpdateError;

/// Source of candidate releases.
///
/// Implementations return every release satisfying `constraint`, in catalog
/// order. `allow_prereleases` is passed through so a catalog may skip fetching
/// pre-release metadata, but pre-release filtering itself is the selector's
/// job; returning pre-releases regardless is always correct.
pub trait ReleaseCatalog {
    fn find_releases(
        &self,
        constraint: &ReleaseConstraint,
        allow_prereleases: bool,
    ) -> impl Future<Output = Result<Vec<Release>, UpdateError>> + Send;
}

/// In-memory catalog over a fixed release list.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    releases: Vec<Release>,
}

impl StaticCatalog {
    #[must_use]
    pub const fn new(releases: Vec<Release>) -> Self {
        Self {
            releases,
        }
    }

    /// Catalog from version labels; unparsable labels are skipped.
    pub fn from_labels<'a>(labels: impl IntoIterator<Item = &'a str>) -> Self {
        Self::new(labels.into_iter().filter_map(Release::parse).collect())
    }
}

impl ReleaseCatalog for StaticCatalog {
    async fn find_releases(
        &self,
        constraint: &ReleaseConstraint,
        _allow_prereleases: bool,
    ) -> Result<Vec<Release>, UpdateError> {
        Ok(self
            .releases
            .iter()
            .filter(|release| constraint.matches(release.version()))
            .cloned()
            .collect())
    }
}

#[derive(Debug, Deserialize)]
struct PypiProject {
    #[serde(default)]
    releases: BTreeMap<String, Vec<PypiFile>>,
}

#[derive(Debug, Deserialize)]
struct PypiFile {
    #[serde(default)]
    yanked: bool,
}

/// Catalog backed by the PyPI JSON API (`{index}/{project}/json`).
///
/// A version whose uploaded files are all yanked is not offered. Versions
/// with no files at all are kept, since the installer archives are hosted
/// separately from the package index.
#[derive(Debug, Clone)]
pub struct PypiCatalog {
    client: reqwest::Client,
    index_url: String,
    project: String,
}

impl PypiCatalog {
    /// Catalog for `config.tool_name` on `config.catalog_url`.
    pub fn new(config: &UpdaterConfig) -> Result<Self, UpdateError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| UpdateError::Catalog {
                url: config.catalog_url.clone(),
                reason: e.to_string(),
            })?;
        Ok(Self::with_client(client, &config.catalog_url, &config.tool_name))
    }

    pub fn with_client(client: reqwest::Client, index_url: &str, project: &str) -> Self {
        Self {
            client,
            index_url: index_url.trim_end_matches('/').to_string(),
            project: project.to_string(),
        }
    }

    fn project_url(&self) -> String {
        format!("{}/{}/json", self.index_url, self.project)
    }

    async fn fetch_project(&self) -> Result<PypiProject, UpdateError> {
        let url = self.project_url();
        let catalog_error = |reason: String| UpdateError::Catalog {
            url: url.clone(),
            reason,
        };

        tracing::debug!("Querying release catalog {url}");
        let response = self.client.get(&url).send().await.map_err(|e| catalog_error(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(catalog_error(format!("project '{}' not found", self.project)));
        }
        if !status.is_success() {
            return Err(catalog_error(format!("HTTP {status}")));
        }

        response
            .json::<PypiProject>()
            .await
            .map_err(|e| catalog_error(format!("invalid catalog response: {e}")))
    }
}

impl ReleaseCatalog for PypiCatalog {
    async fn find_releases(
        &self,
        constraint: &ReleaseConstraint,
        allow_prereleases: bool,
    ) -> Result<Vec<Release>, UpdateError> {
        let project = self.fetch_project().await?;
        let total = project.releases.len();

        let releases: Vec<Release> = project
            .releases
            .into_iter()
            .filter(|(label, files)| {
                let yanked = !files.is_empty() && files.iter().all(|file| file.yanked);
                if yanked {
                    tracing::debug!("Skipping yanked release {label}");
                }
                !yanked
            })
            .filter_map(|(label, _)| {
                let release = Release::parse(&label);
                if release.is_none() {
                    tracing::debug!("Skipping unparsable release label {label}");
                }
                release
            })
            .filter(|release| constraint.matches(release.version()))
            .collect();

        tracing::debug!(
            "Catalog offers {} of {total} releases for {constraint} (prereleases allowed: {allow_prereleases})",
            releases.len()
        );
        Ok(releases)
    }
}
