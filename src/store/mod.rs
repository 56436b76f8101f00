//! Versioned secret stores.
//!
//! The engine reads plaintext through the `SecretStore` trait and, when
//! rotating, writes new versions back. Two implementations ship here:
//! - `MemoryStore`: in-process, for tests and embedding
//! - `LocalStore`: a password-protected encrypted file for local use

pub mod format;
pub mod local;
pub mod memory;

pub use local::LocalStore;
pub use memory::MemoryStore;

use chrono::{DateTime, Utc};
use zeroize::Zeroizing;

use crate::errors::{Result, SealVaultError};
use crate::metadata::GsmVersion;

/// Metadata about one stored version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionInfo {
    pub resource: String,
    pub version: GsmVersion,
    pub created_at: DateTime<Utc>,
}

/// A versioned key-value secret store.
///
/// Versions are numbered from 1 per resource and never change once
/// written. Implementations must be safe to share across threads.
pub trait SecretStore: Send + Sync {
    /// Plaintext of `resource` at `version`.
    ///
    /// Fails with `SecretVersionNotFound` when either is absent.
    fn access_version(&self, resource: &str, version: &GsmVersion) -> Result<Zeroizing<Vec<u8>>>;

    /// Append a version to an existing resource and return its number.
    fn add_version(&self, resource: &str, payload: &[u8]) -> Result<GsmVersion>;

    /// Like `add_version`, creating the resource first when absent.
    fn create_secret_version(&self, resource: &str, payload: &[u8]) -> Result<GsmVersion>;

    /// `Some` with the version's metadata when it exists.
    fn secret_version_exists(
        &self,
        resource: &str,
        version: &GsmVersion,
    ) -> Result<Option<VersionInfo>>;
}

/// Check that a resource name is usable as a store identifier.
///
/// Allowed: ASCII letters, digits, `_` and `-`; 1 to 255 characters.
pub fn validate_resource_name(name: &str) -> Result<()> {
    if name.is_empty() || name.len() > 255 {
        return Err(SealVaultError::StoreWrite {
            resource: name.to_string(),
            detail: "resource name must be 1 to 255 characters".into(),
        });
    }
    if !name
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
    {
        return Err(SealVaultError::StoreWrite {
            resource: name.to_string(),
            detail: "only ASCII letters, digits, '_' and '-' are allowed".into(),
        });
    }
    Ok(())
}

pub(crate) fn version_not_found(resource: &str, version: &GsmVersion) -> SealVaultError {
    SealVaultError::SecretVersionNotFound {
        resource: resource.to_string(),
        version: version.to_string(),
    }
}
