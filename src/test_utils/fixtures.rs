//! Fixtures for release archives and installation trees.

use flate2::Compression;
use flate2::write::GzEncoder;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::Path;
use tar::{Builder, EntryType, Header};

/// One entry of a generated release archive.
#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    pub path: String,
    pub contents: Vec<u8>,
    pub mode: u32,
    pub kind: EntryType,
}

impl ArchiveEntry {
    pub fn file(path: &str, contents: &[u8], mode: u32) -> Self {
        Self {
            path: path.to_string(),
            contents: contents.to_vec(),
            mode,
            kind: EntryType::Regular,
        }
    }

    pub fn dir(path: &str) -> Self {
        Self {
            path: path.to_string(),
            contents: Vec::new(),
            mode: 0o755,
            kind: EntryType::Directory,
        }
    }
}

/// Build a gzip-compressed tar archive from `entries`.
///
/// Entry names are written into the header verbatim, so hostile names such as
/// `../escape` can be produced for extraction tests.
pub fn build_tar_gz(entries: &[ArchiveEntry]) -> Vec<u8> {
    let mut builder = Builder::new(GzEncoder::new(Vec::new(), Compression::default()));

    for entry in entries {
        let mut header = Header::new_gnu();
        let name = entry.path.as_bytes();
        let gnu = header.as_gnu_mut().unwrap();
        assert!(name.len() < gnu.name.len(), "fixture path too long: {}", entry.path);
        gnu.name[..name.len()].copy_from_slice(name);

        header.set_entry_type(entry.kind);
        header.set_size(entry.contents.len() as u64);
        header.set_mode(entry.mode);
        header.set_mtime(1_700_000_000);
        header.set_cksum();
        builder.append(&header, entry.contents.as_slice()).unwrap();
    }

    builder.into_inner().unwrap().finish().unwrap()
}

/// Standard library tree of a release: a package marker carrying `version`.
pub fn release_tree(tool: &str, version: &str) -> Vec<ArchiveEntry> {
    vec![
        ArchiveEntry::dir(&format!("{tool}/")),
        ArchiveEntry::file(
            &format!("{tool}/__version__.py"),
            format!("__version__ = \"{version}\"\n").as_bytes(),
            0o644,
        ),
        ArchiveEntry::file(&format!("{tool}/_vendor/py3.8/vendored.py"), b"VENDORED = True\n", 0o644),
        ArchiveEntry::file(&format!("{tool}/bin/helper.sh"), b"#!/bin/sh\necho helper\n", 0o755),
    ]
}

/// Lowercase hex SHA-256 of `bytes`.
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Create files under `root` from `(relative path, contents)` pairs.
pub fn seed_tree(root: &Path, files: &[(&str, &str)]) {
    for (relative, contents) in files {
        let path = root.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }
}

/// Snapshot of a directory tree: relative path to (contents, permission bits).
///
/// Directories map to empty contents. Permission bits are zero on non-Unix
/// platforms.
pub fn snapshot_tree(root: &Path) -> BTreeMap<String, (Vec<u8>, u32)> {
    fn walk(root: &Path, dir: &Path, out: &mut BTreeMap<String, (Vec<u8>, u32)>) {
        let mut entries: Vec<_> = std::fs::read_dir(dir).unwrap().map(|e| e.unwrap()).collect();
        entries.sort_by_key(std::fs::DirEntry::file_name);

        for entry in entries {
            let path = entry.path();
            let relative =
                path.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/");
            let metadata = std::fs::metadata(&path).unwrap();
            let mode = permission_bits(&metadata);
            if metadata.is_dir() {
                out.insert(format!("{relative}/"), (Vec::new(), mode));
                walk(root, &path, out);
            } else {
                out.insert(relative, (std::fs::read(&path).unwrap(), mode));
            }
        }
    }

    let mut out = BTreeMap::new();
    walk(root, root, &mut out);
    out
}

#[cfg(unix)]
fn permission_bits(metadata: &std::fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o777
}

#[cfg(not(unix))]
fn permission_bits(_metadata: &std::fs::Metadata) -> u32 {
    0
}
