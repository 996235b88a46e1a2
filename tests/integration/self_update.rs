//! End-to-end updates against a local release server.

use selfup_cli::config::UpdaterConfig;
use selfup_cli::core::UpdateError;
use selfup_cli::test_utils::fixtures::{build_tar_gz, release_tree, snapshot_tree};
use selfup_cli::upgrade::release::NoneFoundReason;
use selfup_cli::upgrade::{
    InstallationLayout, Platform, PypiCatalog, UpdateOrchestrator, UpdateOutcome,
};
use semver::Version;

use crate::fixtures::{Installation, PLATFORM, Python3Probe, ReleaseServer, orchestrator};

#[tokio::test]
async fn test_update_installs_newest_stable_release() {
    let server = ReleaseServer::start().await;
    server.publish("1.2.0").await;
    let installation = Installation::new("1.1.0");

    let outcome = orchestrator(&server, &installation, "1.1.0", &["1.1.0", "1.2.0", "1.3.0a1"])
        .run(None, false)
        .await
        .unwrap();

    let UpdateOutcome::Updated {
        release,
        launcher,
    } = &outcome
    else {
        panic!("expected an update, got {outcome:?}");
    };
    assert_eq!(release.tag(), "1.2.0");
    assert_eq!(outcome.message("poetry"), "Poetry (1.2.0) is installed now. Great!");

    assert!(installation.installed_version_file().contains("1.2.0"));
    // The new tree replaces the old one wholesale.
    assert!(!installation.layout.lib_dir().join("poetry/legacy_only.py").exists());
    assert!(!installation.layout.backup_dir().exists());

    assert_eq!(launcher, &installation.layout.bin_dir().join("poetry"));
    let script = std::fs::read_to_string(launcher).unwrap();
    assert!(script.starts_with("#!/usr/bin/env python3\n"));
    assert!(script.contains("from poetry.console import main"));

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(launcher).unwrap().permissions().mode();
        assert_ne!(mode & 0o111, 0, "launcher must be executable");

        let helper = installation.layout.lib_dir().join("poetry/bin/helper.sh");
        let mode = std::fs::metadata(helper).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }
}

#[tokio::test]
async fn test_preview_selects_prerelease() {
    let server = ReleaseServer::start().await;
    server.publish("1.3.0a1").await;
    let installation = Installation::new("1.1.0");

    let outcome = orchestrator(&server, &installation, "1.1.0", &["1.1.0", "1.2.0", "1.3.0a1"])
        .run(None, true)
        .await
        .unwrap();

    match outcome {
        UpdateOutcome::Updated {
            release,
            ..
        } => {
            assert_eq!(release.tag(), "1.3.0a1");
            assert!(release.is_prerelease());
        }
        other => panic!("expected an update, got {other:?}"),
    }
    assert!(installation.installed_version_file().contains("1.3.0a1"));
}

#[tokio::test]
async fn test_exact_version_request() {
    let server = ReleaseServer::start().await;
    server.publish("1.1.5").await;
    let installation = Installation::new("1.1.0");

    let outcome = orchestrator(&server, &installation, "1.1.0", &["1.1.0", "1.1.5", "1.2.0"])
        .run(Some("1.1.5"), false)
        .await
        .unwrap();

    assert!(matches!(outcome, UpdateOutcome::Updated { ref release, .. } if release.tag() == "1.1.5"));
}

#[tokio::test]
async fn test_already_current_downloads_nothing() {
    let server = ReleaseServer::start().await;
    server.mount_checksum("1.2.0", 200, "unused").await;
    server.mount_archive("1.2.0", 200, Vec::new(), Some(0)).await;
    let installation = Installation::new("1.2.0");
    let before = snapshot_tree(installation.layout.home());

    let outcome = orchestrator(&server, &installation, "1.2.0", &["1.1.0", "1.2.0"])
        .run(None, false)
        .await
        .unwrap();

    assert_eq!(
        outcome,
        UpdateOutcome::AlreadyCurrent {
            version: Version::new(1, 2, 0)
        }
    );
    assert_eq!(outcome.message("poetry"), "You are using the latest version");
    assert_eq!(snapshot_tree(installation.layout.home()), before);
}

#[tokio::test]
async fn test_installed_version_detected_without_override() {
    let server = ReleaseServer::start().await;
    server.mount_archive("1.2.0", 200, Vec::new(), Some(0)).await;
    let installation = Installation::new("1.2.0");
    let before = snapshot_tree(installation.layout.home());

    let orchestrator = UpdateOrchestrator::new(
        server.config(),
        installation.layout.clone(),
        selfup_cli::upgrade::StaticCatalog::from_labels(["1.1.0", "1.2.0"]),
        Python3Probe,
        installation.executable.clone(),
    )
    .unwrap()
    .with_platform(Platform::Posix, PLATFORM);
    assert_eq!(orchestrator.current_version(), &Version::new(1, 2, 0));

    let outcome = orchestrator.run(None, false).await.unwrap();
    assert_eq!(
        outcome,
        UpdateOutcome::AlreadyCurrent {
            version: Version::new(1, 2, 0)
        }
    );
    assert_eq!(snapshot_tree(installation.layout.home()), before);
}

#[tokio::test]
async fn test_unknown_version_is_none_found() {
    let server = ReleaseServer::start().await;
    let installation = Installation::new("1.1.0");

    let outcome = orchestrator(&server, &installation, "1.1.0", &["1.1.0", "1.2.0"])
        .run(Some("9.9.9"), false)
        .await
        .unwrap();

    assert_eq!(
        outcome,
        UpdateOutcome::NoneFound {
            reason: NoneFoundReason::NoMatchingRelease
        }
    );
    assert_eq!(outcome.message("poetry"), "No release found for the specified version");
}

#[tokio::test]
async fn test_missing_checksum_leaves_installation_untouched() {
    let server = ReleaseServer::start().await;
    server.mount_checksum("1.2.0", 404, "").await;
    server.mount_archive("1.2.0", 200, Vec::new(), Some(0)).await;
    let installation = Installation::new("1.1.0");
    let before = snapshot_tree(installation.layout.home());

    let err = orchestrator(&server, &installation, "1.1.0", &["1.2.0"])
        .run(None, false)
        .await
        .unwrap_err();

    match err {
        UpdateError::ChecksumMissing {
            file,
            ..
        } => assert_eq!(file, format!("poetry-1.2.0-{PLATFORM}.sha256sum")),
        other => panic!("expected ChecksumMissing, got {other:?}"),
    }
    assert_eq!(snapshot_tree(installation.layout.home()), before);
}

#[tokio::test]
async fn test_mismatched_checksum_leaves_installation_untouched() {
    let server = ReleaseServer::start().await;
    let archive = build_tar_gz(&release_tree("poetry", "1.2.0"));
    server.publish_raw("1.2.0", &archive, &"0".repeat(64)).await;
    let installation = Installation::new("1.1.0");
    let before = snapshot_tree(installation.layout.home());

    let err = orchestrator(&server, &installation, "1.1.0", &["1.2.0"])
        .run(None, false)
        .await
        .unwrap_err();

    assert!(matches!(err, UpdateError::Integrity { .. }), "got {err:?}");
    assert!(err.to_string().starts_with("Hashes for"));
    assert_eq!(snapshot_tree(installation.layout.home()), before);
}

#[tokio::test]
async fn test_unsupported_installation_is_rejected_before_network() {
    let server = ReleaseServer::start().await;
    server.mount_archive("1.2.0", 200, Vec::new(), Some(0)).await;
    let installation = Installation::new("1.1.0");
    let elsewhere = tempfile::TempDir::new().unwrap();

    let orchestrator = UpdateOrchestrator::new(
        server.config(),
        installation.layout.clone(),
        selfup_cli::upgrade::StaticCatalog::from_labels(["1.2.0"]),
        Python3Probe,
        elsewhere.path().join("poetry"),
    )
    .unwrap()
    .with_current_version(Version::new(1, 1, 0))
    .with_platform(Platform::Posix, PLATFORM);

    let err = orchestrator.run(None, false).await.unwrap_err();
    assert!(matches!(err, UpdateError::UnsupportedInstallation { .. }), "got {err:?}");
    assert!(err.to_string().contains("was not installed with the recommended installer"));
}

#[tokio::test]
async fn test_pypi_catalog_skips_yanked_releases() {
    let server = ReleaseServer::start().await;
    server
        .publish_catalog(&[("1.1.0", false), ("1.2.0", false), ("1.3.0", true), ("1.4.0b1", false)])
        .await;
    server.publish("1.2.0").await;
    let installation = Installation::new("1.1.0");

    let config = UpdaterConfig {
        home_env: "SELFUP_TEST_UNUSED_HOME".to_string(),
        ..server.config()
    };
    let catalog = PypiCatalog::new(&config).unwrap();
    let orchestrator = UpdateOrchestrator::new(
        config,
        InstallationLayout::new(installation.layout.home()),
        catalog,
        Python3Probe,
        installation.executable.clone(),
    )
    .unwrap()
    .with_current_version(Version::new(1, 1, 0))
    .with_platform(Platform::Posix, PLATFORM);

    let outcome = orchestrator.run(None, false).await.unwrap();
    assert!(
        matches!(outcome, UpdateOutcome::Updated { ref release, .. } if release.tag() == "1.2.0"),
        "got {outcome:?}"
    );
    assert!(installation.installed_version_file().contains("1.2.0"));
}

#[tokio::test]
async fn test_second_update_replaces_previous_update() {
    let server = ReleaseServer::start().await;
    server.publish("1.2.0").await;
    server.publish("1.3.0").await;
    let installation = Installation::new("1.1.0");

    orchestrator(&server, &installation, "1.1.0", &["1.2.0"]).run(None, false).await.unwrap();
    assert!(installation.installed_version_file().contains("1.2.0"));

    orchestrator(&server, &installation, "1.2.0", &["1.2.0", "1.3.0"])
        .run(None, false)
        .await
        .unwrap();
    assert!(installation.installed_version_file().contains("1.3.0"));
    assert!(!installation.layout.backup_dir().exists());
}
