//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use sealvault::atomic::AtomicWriter;
use sealvault::engine::EngineConfig;
use sealvault::errors::{Result, SealVaultError};
use sealvault::metadata::{MetadataStore, SealScope};
use sealvault::seal::Sealer;
use sealvault::store::MemoryStore;
use tempfile::TempDir;

/// Seals to a readable, deterministic string and counts calls.
#[derive(Default)]
pub struct RecordingSealer {
    calls: AtomicUsize,
}

impl RecordingSealer {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// What `seal` returns for these inputs.
    pub fn expected(name: &str, namespace: &str, key_name: &str, plaintext: &[u8]) -> String {
        format!("sealed:{namespace}/{name}/{key_name}:{}", hex::encode(plaintext))
    }
}

impl Sealer for RecordingSealer {
    fn seal(
        &self,
        secret_name: &str,
        namespace: &str,
        key_name: &str,
        plaintext: &[u8],
        _scope: SealScope,
    ) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Self::expected(secret_name, namespace, key_name, plaintext))
    }
}

/// Fails on one key name, seals the rest like `RecordingSealer`.
pub struct FailingSealer {
    pub fail_on: String,
}

impl Sealer for FailingSealer {
    fn seal(
        &self,
        secret_name: &str,
        namespace: &str,
        key_name: &str,
        plaintext: &[u8],
        _scope: SealScope,
    ) -> Result<String> {
        if key_name == self.fail_on {
            return Err(SealVaultError::Seal {
                key: key_name.to_string(),
                detail: "certificate rejected".into(),
            });
        }
        Ok(RecordingSealer::expected(
            secret_name,
            namespace,
            key_name,
            plaintext,
        ))
    }
}

/// A writer whose disk is always full.
pub struct FailingWriter;

impl AtomicWriter for FailingWriter {
    fn write(&self, path: &Path, _contents: &[u8]) -> Result<()> {
        Err(SealVaultError::ManifestWrite {
            path: path.to_path_buf(),
            detail: "no space left on device".into(),
        })
    }
}

/// A project directory with `metadata/` and `manifests/` plus a memory store.
pub struct Fixture {
    pub dir: TempDir,
    pub metadata: MetadataStore,
    pub store: MemoryStore,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("metadata")).unwrap();
        fs::create_dir_all(dir.path().join("manifests")).unwrap();
        let metadata = MetadataStore::new(dir.path().join("metadata"));
        Self {
            dir,
            metadata,
            store: MemoryStore::new(),
        }
    }

    pub fn add_metadata(&self, short_name: &str, yaml: &str) {
        fs::write(self.metadata.path_for(short_name), yaml).unwrap();
    }

    pub fn manifest_path(&self, short_name: &str) -> PathBuf {
        self.dir
            .path()
            .join("manifests")
            .join(format!("{short_name}.yaml"))
    }

    pub fn write_manifest(&self, short_name: &str, yaml: &str) {
        fs::write(self.manifest_path(short_name), yaml).unwrap();
    }

    pub fn read_manifest(&self, short_name: &str) -> String {
        fs::read_to_string(self.manifest_path(short_name)).unwrap()
    }

    pub fn config(&self, dry_run: bool) -> EngineConfig {
        EngineConfig {
            dry_run,
            manifest_root: self.dir.path().to_path_buf(),
        }
    }
}

/// Metadata for a secret of plain store-backed keys, each pinned to
/// version 1 of `<short_name>-<key>`.
pub fn gsm_secret(short_name: &str, keys: &[&str]) -> String {
    let mut yaml = header(short_name);
    for key in keys {
        yaml.push_str(&format!(
            "  - keyName: {key}\n    source: {{ kind: gsm }}\n    gsmRef: {{ secretResource: {short_name}-{key}, version: \"1\" }}\n"
        ));
    }
    yaml
}

/// The common head of a metadata document, up to `keys:`.
pub fn header(short_name: &str) -> String {
    format!(
        "shortName: {short_name}\nmanifestPath: manifests/{short_name}.yaml\nsealedSecret:\n  name: {short_name}\n  namespace: default\nkeys:\n"
    )
}

/// An existing manifest with the given encrypted entries.
pub fn manifest_yaml(name: &str, entries: &[(&str, &str)]) -> String {
    let mut yaml = format!(
        "apiVersion: bitnami.com/v1alpha1\nkind: SealedSecret\nmetadata:\n  name: {name}\n  namespace: default\n  labels:\n    team: payments\nspec:\n  encryptedData:\n"
    );
    for (key, value) in entries {
        yaml.push_str(&format!("    {key}: {value}\n"));
    }
    yaml.push_str("  template:\n    type: Opaque\n");
    yaml
}
