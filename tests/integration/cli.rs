//! The `selfup` binary: exit status and messages.

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::fixtures::ReleaseServer;

/// Directory holding the built binary; used as a home the binary lives in.
fn binary_home() -> PathBuf {
    let binary = assert_cmd::cargo::cargo_bin("selfup");
    binary.parent().unwrap().to_path_buf()
}

fn write_config(dir: &Path, server: &ReleaseServer) -> PathBuf {
    let config_path = dir.join("config.toml");
    std::fs::write(
        &config_path,
        format!(
            "release_base_url = \"{}\"\ncatalog_url = \"{}\"\nrequest_timeout_secs = 10\n",
            server.releases_url(),
            server.catalog_url()
        ),
    )
    .unwrap();
    config_path
}

fn selfup(home: &Path, config: &Path) -> Command {
    let mut cmd = Command::cargo_bin("selfup").unwrap();
    cmd.env("POETRY_HOME", home).env_remove("RUST_LOG").arg("--config").arg(config);
    cmd
}

#[test]
fn test_help() {
    Command::cargo_bin("selfup")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("self-update"));
}

#[test]
fn test_self_update_help_lists_preview() {
    Command::cargo_bin("selfup")
        .unwrap()
        .args(["self-update", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--preview"));
}

#[test]
fn test_foreign_installation_exits_with_error() {
    let temp = TempDir::new().unwrap();
    let home = temp.path().join(".poetry");
    std::fs::create_dir_all(&home).unwrap();

    selfup(&home, &temp.path().join("missing.toml"))
        .arg("self-update")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("was not installed with the recommended installer"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_no_release_found_exits_successfully() {
    let server = ReleaseServer::start().await;
    Mock::given(method("GET"))
        .and(path("/pypi/poetry/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "releases": {}
        })))
        .mount(&server.server)
        .await;

    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path(), &server);
    let home = binary_home();

    let assert = tokio::task::spawn_blocking(move || {
        selfup(&home, &config).args(["--no-progress", "self-update"]).assert()
    })
    .await
    .unwrap();

    assert.success().stdout(predicate::str::contains("No release found for the specified version"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_catalog_failure_exits_with_error() {
    let server = ReleaseServer::start().await;
    Mock::given(method("GET"))
        .and(path("/pypi/poetry/json"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server.server)
        .await;

    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path(), &server);
    let home = binary_home();

    let assert = tokio::task::spawn_blocking(move || {
        selfup(&home, &config).args(["--quiet", "self-update"]).assert()
    })
    .await
    .unwrap();

    assert.failure().code(1).stderr(predicate::str::contains("error"));
}

#[test]
fn test_invalid_version_constraint_exits_with_error() {
    let temp = TempDir::new().unwrap();

    selfup(&binary_home(), &temp.path().join("missing.toml"))
        .args(["self-update", "!!"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Invalid version constraint"));
}
