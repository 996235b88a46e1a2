#![allow(dead_code)]

use selfup_cli::config::UpdaterConfig;
use selfup_cli::test_utils::fixtures::{build_tar_gz, release_tree, seed_tree, sha256_hex};
use selfup_cli::upgrade::launcher::Candidate;
use selfup_cli::upgrade::{
    InstallationLayout, Platform, StaticCatalog, UpdateOrchestrator, VersionProbe,
};
use semver::Version;
use std::path::PathBuf;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TOOL: &str = "poetry";
pub const PLATFORM: &str = "linux";

/// HTTP server publishing release archives and a PyPI-style catalog.
pub struct ReleaseServer {
    pub server: MockServer,
}

impl ReleaseServer {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    pub fn uri(&self) -> String {
        self.server.uri()
    }

    /// Base URL for release downloads.
    pub fn releases_url(&self) -> String {
        format!("{}/releases", self.server.uri())
    }

    /// Base URL of the JSON catalog.
    pub fn catalog_url(&self) -> String {
        format!("{}/pypi", self.server.uri())
    }

    fn base_name(tag: &str) -> String {
        format!("{TOOL}-{tag}-{PLATFORM}")
    }

    /// Publish the standard release tree for `tag` with a correct checksum.
    pub async fn publish(&self, tag: &str) -> Vec<u8> {
        let archive = build_tar_gz(&release_tree(TOOL, tag));
        self.publish_raw(tag, &archive, &sha256_hex(&archive)).await;
        archive
    }

    pub async fn publish_raw(&self, tag: &str, archive: &[u8], checksum: &str) {
        self.mount_checksum(tag, 200, checksum).await;
        self.mount_archive(tag, 200, archive.to_vec(), None).await;
    }

    pub async fn mount_checksum(&self, tag: &str, status: u16, body: &str) {
        Mock::given(method("GET"))
            .and(path(format!("/releases/{tag}/{}.sha256sum", Self::base_name(tag))))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(&self.server)
            .await;
    }

    /// Mount the archive; with `expected_hits` the server verifies the count on drop.
    pub async fn mount_archive(
        &self,
        tag: &str,
        status: u16,
        body: Vec<u8>,
        expected_hits: Option<u64>,
    ) {
        let mock = Mock::given(method("GET"))
            .and(path(format!("/releases/{tag}/{}.tar.gz", Self::base_name(tag))))
            .respond_with(ResponseTemplate::new(status).set_body_bytes(body));
        let mock = match expected_hits {
            Some(hits) => mock.expect(hits),
            None => mock,
        };
        mock.mount(&self.server).await;
    }

    /// Serve a PyPI JSON document listing `releases` as `(label, yanked)`.
    pub async fn publish_catalog(&self, releases: &[(&str, bool)]) {
        let releases: serde_json::Map<String, serde_json::Value> = releases
            .iter()
            .map(|(label, yanked)| {
                (
                    (*label).to_string(),
                    serde_json::json!([{ "filename": format!("{TOOL}-{label}.tar.gz"), "yanked": yanked }]),
                )
            })
            .collect();

        Mock::given(method("GET"))
            .and(path(format!("/pypi/{TOOL}/json")))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "info": { "name": TOOL },
                "releases": releases,
            })))
            .mount(&self.server)
            .await;
    }

    pub fn config(&self) -> UpdaterConfig {
        UpdaterConfig {
            release_base_url: self.releases_url(),
            catalog_url: self.catalog_url(),
            request_timeout_secs: 10,
            ..UpdaterConfig::default()
        }
    }
}

/// An installation made by the installer: home with lib/ and bin/poetry.
pub struct Installation {
    pub _temp: TempDir,
    pub layout: InstallationLayout,
    pub executable: PathBuf,
}

impl Installation {
    pub fn new(version: &str) -> Self {
        let temp = TempDir::new().unwrap();
        let layout = InstallationLayout::new(temp.path().join(".poetry"));
        seed_tree(
            layout.lib_dir(),
            &[
                ("poetry/__version__.py", &format!("__version__ = \"{version}\"\n")),
                ("poetry/legacy_only.py", "# removed in newer releases\n"),
            ],
        );
        let executable = layout.bin_dir().join(TOOL);
        seed_tree(layout.bin_dir(), &[(TOOL, "old launcher")]);
        Self {
            _temp: temp,
            layout,
            executable,
        }
    }

    pub fn installed_version_file(&self) -> String {
        std::fs::read_to_string(self.layout.lib_dir().join("poetry/__version__.py")).unwrap()
    }
}

/// Probe that reports Python 3 for `python3` only.
pub struct Python3Probe;

impl VersionProbe for Python3Probe {
    fn query_version(&self, candidate: &Candidate) -> Option<String> {
        (candidate.command_line() == "python3").then(|| "Python 3.8.10\n".to_string())
    }
}

/// Orchestrator for `installation` running `current`, fed by a static catalog.
pub fn orchestrator(
    server: &ReleaseServer,
    installation: &Installation,
    current: &str,
    labels: &[&str],
) -> UpdateOrchestrator<StaticCatalog, Python3Probe> {
    UpdateOrchestrator::new(
        server.config(),
        installation.layout.clone(),
        StaticCatalog::from_labels(labels.iter().copied()),
        Python3Probe,
        installation.executable.clone(),
    )
    .unwrap()
    .with_current_version(Version::parse(current).unwrap())
    .with_platform(Platform::Posix, PLATFORM)
}
