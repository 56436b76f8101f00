//! Tests for the encrypted local store and the local sealer, together
//! with the engine.

mod common;

use std::fs;

use common::{gsm_secret, Fixture};
use sealvault::atomic::FsAtomicWriter;
use sealvault::crypto::{generate_sealing_key, Argon2Params};
use sealvault::engine::ResealEngine;
use sealvault::errors::{ErrorKind, SealVaultError};
use sealvault::manifest::SealedSecretManifest;
use sealvault::metadata::{GsmVersion, SealScope};
use sealvault::seal::LocalSealer;
use sealvault::store::{LocalStore, SecretStore};
use tempfile::TempDir;

const PASSWORD: &[u8] = b"correct horse battery";

fn fast_params() -> Argon2Params {
    Argon2Params {
        memory_kib: 8192,
        iterations: 1,
        parallelism: 1,
    }
}

#[test]
fn versions_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("store.svst");

    {
        let store = LocalStore::create(&path, PASSWORD, &fast_params()).unwrap();
        assert_eq!(store.create_secret_version("db-pass", b"one").unwrap().as_str(), "1");
        assert_eq!(store.add_version("db-pass", b"two").unwrap().as_str(), "2");
        store.create_secret_version("api-key", b"k").unwrap();
    }

    let store = LocalStore::open(&path, PASSWORD).unwrap();
    let v1 = store
        .access_version("db-pass", &GsmVersion::from_number(1))
        .unwrap();
    assert_eq!(v1.as_slice(), b"one");
    let v2 = store
        .access_version("db-pass", &GsmVersion::from_number(2))
        .unwrap();
    assert_eq!(v2.as_slice(), b"two");

    assert_eq!(
        store.list_resources().unwrap(),
        vec![("api-key".to_string(), 1), ("db-pass".to_string(), 2)]
    );

    let info = store
        .secret_version_exists("db-pass", &GsmVersion::from_number(2))
        .unwrap()
        .unwrap();
    assert_eq!(info.resource, "db-pass");
    assert!(store
        .secret_version_exists("db-pass", &GsmVersion::from_number(3))
        .unwrap()
        .is_none());
}

#[test]
fn plaintext_never_reaches_disk() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("store.svst");
    let store = LocalStore::create(&path, PASSWORD, &fast_params()).unwrap();
    store
        .create_secret_version("db-pass", b"very-recognisable-plaintext")
        .unwrap();

    let raw = fs::read(&path).unwrap();
    let needle = b"very-recognisable-plaintext";
    assert!(!raw.windows(needle.len()).any(|w| w == needle));
}

#[test]
fn wrong_password_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("store.svst");
    LocalStore::create(&path, PASSWORD, &fast_params()).unwrap();

    let err = LocalStore::open(&path, b"wrong password").err().unwrap();
    assert!(matches!(err, SealVaultError::HmacMismatch));
}

#[test]
fn tampering_is_detected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("store.svst");
    let store = LocalStore::create(&path, PASSWORD, &fast_params()).unwrap();
    store.create_secret_version("db-pass", b"secret").unwrap();
    drop(store);

    let mut raw = fs::read(&path).unwrap();
    // Last byte before the 32-byte HMAC trailer sits inside the body.
    let target = raw.len() - 33;
    raw[target] ^= 0x01;
    fs::write(&path, raw).unwrap();

    let err = LocalStore::open(&path, PASSWORD).err().unwrap();
    assert_eq!(err.kind(), ErrorKind::StoreReadError);
}

#[test]
fn create_refuses_to_overwrite() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("store.svst");
    LocalStore::create(&path, PASSWORD, &fast_params()).unwrap();
    let err = LocalStore::create(&path, PASSWORD, &fast_params()).err().unwrap();
    assert_eq!(err.kind(), ErrorKind::StoreWriteError);
}

#[test]
fn missing_version_is_a_store_read_error() {
    let dir = TempDir::new().unwrap();
    let store =
        LocalStore::create(&dir.path().join("store.svst"), PASSWORD, &fast_params()).unwrap();
    let err = store
        .access_version("nope", &GsmVersion::from_number(1))
        .unwrap_err();
    assert!(matches!(err, SealVaultError::SecretVersionNotFound { .. }));
    assert!(store.add_version("nope", b"x").is_err());
}

#[test]
fn engine_output_unseals_to_store_values() {
    let fx = Fixture::new();
    let store = LocalStore::create(
        &fx.dir.path().join("store.svst"),
        PASSWORD,
        &fast_params(),
    )
    .unwrap();
    store.create_secret_version("app-db-password", b"s3cr3t").unwrap();
    store.create_secret_version("app-db-user", b"app").unwrap();
    fx.add_metadata("app-db", &gsm_secret("app-db", &["password", "user"]));

    let key = generate_sealing_key(&fx.dir.path().join("sealing.key")).unwrap();
    let sealer = LocalSealer::new(key);
    let engine = ResealEngine::new(&store, &sealer, &fx.metadata, &FsAtomicWriter, fx.config(false));

    engine.reseal("app-db").unwrap();

    let manifest = SealedSecretManifest::load(&fx.manifest_path("app-db")).unwrap();
    let password = sealer
        .unseal(
            "app-db",
            "default",
            &manifest.spec.encrypted_data["password"],
            SealScope::Strict,
        )
        .unwrap();
    assert_eq!(password.as_slice(), b"s3cr3t");

    // Strict scope binds to the name.
    assert!(sealer
        .unseal(
            "other",
            "default",
            &manifest.spec.encrypted_data["password"],
            SealScope::Strict,
        )
        .is_err());
}
