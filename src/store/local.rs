//! Password-protected local store.
//!
//! All resources live in one file (see `format`). The store key is
//! derived from the password with Argon2id; every resource gets its own
//! HKDF sub-key, and each version's ciphertext is bound to
//! `<resource>#<version>` so versions cannot be swapped on disk.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use tracing::debug;
use zeroize::Zeroizing;

use crate::atomic::{AtomicWriter, FsAtomicWriter};
use crate::crypto::{decrypt, derive_store_key, encrypt, generate_salt, Argon2Params, StoreKey};
use crate::errors::{Result, SealVaultError};
use crate::metadata::GsmVersion;

use super::format::{self, StoreHeader, StoredResource, StoredVersion, CURRENT_VERSION};
use super::{validate_resource_name, version_not_found, SecretStore, VersionInfo};

pub struct LocalStore {
    path: PathBuf,
    header: StoreHeader,
    resources: Mutex<BTreeMap<String, StoredResource>>,
    key: StoreKey,
}

impl LocalStore {
    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    /// Create an empty store at `path` and write it to disk.
    pub fn create(path: &Path, password: &[u8], params: &Argon2Params) -> Result<Self> {
        if path.exists() {
            return Err(SealVaultError::StoreWrite {
                resource: path.display().to_string(),
                detail: "store already exists".into(),
            });
        }

        let salt = generate_salt()?;
        let key = derive_store_key(password, &salt, params)?;

        let header = StoreHeader {
            version: CURRENT_VERSION,
            salt: salt.to_vec(),
            created_at: Utc::now(),
            argon2_params: *params,
        };

        let store = Self {
            path: path.to_path_buf(),
            header,
            resources: Mutex::new(BTreeMap::new()),
            key,
        };
        let guard = store.lock()?;
        store.persist(&guard, &path.display().to_string())?;
        drop(guard);

        debug!(path = %path.display(), "created local store");
        Ok(store)
    }

    /// Open an existing store, verifying its HMAC before trusting any data.
    pub fn open(path: &Path, password: &[u8]) -> Result<Self> {
        let raw = format::read_store(path)?;
        let key = derive_store_key(password, &raw.header.salt, &raw.header.argon2_params)?;

        let hmac_key = key.hmac_key()?;
        format::verify_hmac(
            hmac_key.as_ref(),
            &raw.header_bytes,
            &raw.resources_bytes,
            &raw.stored_hmac,
        )?;

        let resources = raw
            .resources
            .into_iter()
            .map(|r| (r.name.clone(), r))
            .collect();

        debug!(path = %path.display(), "opened local store");
        Ok(Self {
            path: path.to_path_buf(),
            header: raw.header,
            resources: Mutex::new(resources),
            key,
        })
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn created_at(&self) -> chrono::DateTime<Utc> {
        self.header.created_at
    }

    /// Resource names with their latest version number, sorted by name.
    pub fn list_resources(&self) -> Result<Vec<(String, u64)>> {
        let guard = self.lock()?;
        Ok(guard
            .values()
            .map(|r| {
                let latest = r.versions.last().map_or(0, |v| v.version);
                (r.name.clone(), latest)
            })
            .collect())
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<String, StoredResource>>> {
        self.resources.lock().map_err(|_| SealVaultError::StoreRead {
            resource: self.path.display().to_string(),
            detail: "store lock poisoned".into(),
        })
    }

    fn context(resource: &str, version: u64) -> String {
        format!("{resource}#{version}")
    }

    fn persist(&self, resources: &BTreeMap<String, StoredResource>, resource: &str) -> Result<()> {
        let list: Vec<StoredResource> = resources.values().cloned().collect();
        let hmac_key = self.key.hmac_key()?;
        let bytes = format::encode_store(&self.header, &list, hmac_key.as_ref())?;
        FsAtomicWriter
            .write(&self.path, &bytes)
            .map_err(|e| SealVaultError::StoreWrite {
                resource: resource.to_string(),
                detail: e.to_string(),
            })
    }

    /// Encrypt and append a version, then save; rolled back if the save fails.
    fn append(
        &self,
        guard: &mut BTreeMap<String, StoredResource>,
        resource: &str,
        payload: &[u8],
    ) -> Result<GsmVersion> {
        let entry = guard
            .get_mut(resource)
            .ok_or_else(|| SealVaultError::StoreWrite {
                resource: resource.to_string(),
                detail: "resource does not exist".into(),
            })?;

        let number = entry.versions.last().map_or(0, |v| v.version) + 1;
        let key = self.key.resource_key(resource)?;
        let ciphertext = encrypt(
            key.as_ref(),
            payload,
            Self::context(resource, number).as_bytes(),
        )
        .map_err(|e| SealVaultError::StoreWrite {
            resource: resource.to_string(),
            detail: e.to_string(),
        })?;

        entry.versions.push(StoredVersion {
            version: number,
            created_at: Utc::now(),
            ciphertext,
        });

        if let Err(e) = self.persist(guard, resource) {
            if let Some(entry) = guard.get_mut(resource) {
                entry.versions.pop();
            }
            return Err(e);
        }

        debug!(resource, version = number, "added store version");
        Ok(GsmVersion::from_number(number))
    }
}

impl SecretStore for LocalStore {
    fn access_version(&self, resource: &str, version: &GsmVersion) -> Result<Zeroizing<Vec<u8>>> {
        let guard = self.lock()?;
        let stored = guard
            .get(resource)
            .and_then(|r| r.versions.iter().find(|v| v.version == version.number()))
            .ok_or_else(|| version_not_found(resource, version))?;

        let key = self.key.resource_key(resource)?;
        decrypt(
            key.as_ref(),
            &stored.ciphertext,
            Self::context(resource, stored.version).as_bytes(),
        )
        .map_err(|e| SealVaultError::StoreRead {
            resource: resource.to_string(),
            detail: e.to_string(),
        })
    }

    fn add_version(&self, resource: &str, payload: &[u8]) -> Result<GsmVersion> {
        let mut guard = self.lock()?;
        self.append(&mut guard, resource, payload)
    }

    fn create_secret_version(&self, resource: &str, payload: &[u8]) -> Result<GsmVersion> {
        validate_resource_name(resource)?;
        let mut guard = self.lock()?;
        let created = !guard.contains_key(resource);
        if created {
            guard.insert(
                resource.to_string(),
                StoredResource {
                    name: resource.to_string(),
                    versions: Vec::new(),
                },
            );
        }
        let result = self.append(&mut guard, resource, payload);
        if result.is_err() && created {
            guard.remove(resource);
        }
        result
    }

    fn secret_version_exists(
        &self,
        resource: &str,
        version: &GsmVersion,
    ) -> Result<Option<VersionInfo>> {
        let guard = self.lock()?;
        Ok(guard
            .get(resource)
            .and_then(|r| r.versions.iter().find(|v| v.version == version.number()))
            .map(|v| VersionInfo {
                resource: resource.to_string(),
                version: version.clone(),
                created_at: v.created_at,
            }))
    }
}
