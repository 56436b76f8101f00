//! In-process secret store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use zeroize::Zeroizing;

use crate::errors::{Result, SealVaultError};
use crate::metadata::GsmVersion;

use super::{validate_resource_name, version_not_found, SecretStore, VersionInfo};

struct StoredVersion {
    data: Zeroizing<Vec<u8>>,
    created_at: DateTime<Utc>,
}

/// A thread-safe store held entirely in memory.
///
/// Counts reads so callers can assert that a code path never touched
/// the store.
#[derive(Default)]
pub struct MemoryStore {
    resources: Mutex<HashMap<String, Vec<StoredVersion>>>,
    reads: AtomicUsize,
    writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a resource with a new version (creating it if needed).
    pub fn insert(&self, resource: &str, payload: &[u8]) -> Result<GsmVersion> {
        self.create_secret_version(resource, payload)
    }

    /// Number of `access_version` calls so far.
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Number of versions written so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Latest version of `resource`, if any.
    pub fn latest_version(&self, resource: &str) -> Option<GsmVersion> {
        let guard = self.resources.lock().ok()?;
        guard
            .get(resource)
            .map(|versions| GsmVersion::from_number(versions.len() as u64))
    }

    fn lock(&self, resource: &str) -> Result<MutexGuard<'_, HashMap<String, Vec<StoredVersion>>>> {
        self.resources.lock().map_err(|_| SealVaultError::StoreRead {
            resource: resource.to_string(),
            detail: "store lock poisoned".into(),
        })
    }

    fn push(versions: &mut Vec<StoredVersion>, payload: &[u8]) -> GsmVersion {
        versions.push(StoredVersion {
            data: Zeroizing::new(payload.to_vec()),
            created_at: Utc::now(),
        });
        GsmVersion::from_number(versions.len() as u64)
    }
}

impl SecretStore for MemoryStore {
    fn access_version(&self, resource: &str, version: &GsmVersion) -> Result<Zeroizing<Vec<u8>>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let guard = self.lock(resource)?;
        let index = version.number().checked_sub(1).map(|n| n as usize);
        guard
            .get(resource)
            .zip(index)
            .and_then(|(versions, i)| versions.get(i))
            .map(|v| v.data.clone())
            .ok_or_else(|| version_not_found(resource, version))
    }

    fn add_version(&self, resource: &str, payload: &[u8]) -> Result<GsmVersion> {
        let mut guard = self.lock(resource)?;
        let versions = guard
            .get_mut(resource)
            .ok_or_else(|| SealVaultError::StoreWrite {
                resource: resource.to_string(),
                detail: "resource does not exist".into(),
            })?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(Self::push(versions, payload))
    }

    fn create_secret_version(&self, resource: &str, payload: &[u8]) -> Result<GsmVersion> {
        validate_resource_name(resource)?;
        let mut guard = self.lock(resource)?;
        let versions = guard.entry(resource.to_string()).or_default();
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(Self::push(versions, payload))
    }

    fn secret_version_exists(
        &self,
        resource: &str,
        version: &GsmVersion,
    ) -> Result<Option<VersionInfo>> {
        let guard = self.lock(resource)?;
        let index = version.number().checked_sub(1).map(|n| n as usize);
        Ok(guard
            .get(resource)
            .zip(index)
            .and_then(|(versions, i)| versions.get(i))
            .map(|v| VersionInfo {
                resource: resource.to_string(),
                version: version.clone(),
                created_at: v.created_at,
            }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;

    #[test]
    fn versions_count_up_from_one() {
        let store = MemoryStore::new();
        assert_eq!(store.insert("db", b"one").unwrap().as_str(), "1");
        assert_eq!(store.add_version("db", b"two").unwrap().as_str(), "2");
        assert_eq!(store.latest_version("db").unwrap().number(), 2);

        let v1 = store.access_version("db", &GsmVersion::from_number(1)).unwrap();
        assert_eq!(v1.as_slice(), b"one");
        assert_eq!(store.read_count(), 1);
        assert_eq!(store.write_count(), 2);
    }

    #[test]
    fn missing_version_is_a_store_read_error() {
        let store = MemoryStore::new();
        store.insert("db", b"x").unwrap();
        for (resource, version) in [("db", 2), ("db", 0), ("nope", 1)] {
            let err = store
                .access_version(resource, &GsmVersion::from_number(version))
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::StoreReadError);
        }
    }

    #[test]
    fn add_version_requires_existing_resource() {
        let store = MemoryStore::new();
        let err = store.add_version("ghost", b"x").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StoreWriteError);
    }

    #[test]
    fn version_exists_reports_metadata() {
        let store = MemoryStore::new();
        store.insert("api", b"t").unwrap();
        let info = store
            .secret_version_exists("api", &GsmVersion::from_number(1))
            .unwrap()
            .unwrap();
        assert_eq!(info.resource, "api");
        assert!(store
            .secret_version_exists("api", &GsmVersion::from_number(2))
            .unwrap()
            .is_none());
    }
}
