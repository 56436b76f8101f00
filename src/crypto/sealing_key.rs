//! The local sealing key.
//!
//! A 32-byte random file created by `sealvault init`. The local sealer
//! derives one AES key per scope label from it.

use std::fs;
use std::path::Path;

use rand::rngs::OsRng;
use rand::TryRngCore;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::errors::{Result, SealVaultError};

/// Length of a sealing key in bytes.
pub const SEALING_KEY_LEN: usize = 32;

/// Create a new sealing key at `path` (owner-only permissions on Unix).
pub fn generate_sealing_key(path: &Path) -> Result<Zeroizing<Vec<u8>>> {
    if path.exists() {
        return Err(SealVaultError::SealingKey(format!(
            "sealing key already exists at {}",
            path.display()
        )));
    }

    let mut key = Zeroizing::new(vec![0u8; SEALING_KEY_LEN]);
    OsRng
        .try_fill_bytes(key.as_mut_slice())
        .map_err(|e| SealVaultError::RandomSource(e.to_string()))?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            SealVaultError::SealingKey(format!("cannot create {}: {e}", parent.display()))
        })?;
    }

    fs::write(path, key.as_slice())
        .map_err(|e| SealVaultError::SealingKey(format!("failed to write sealing key: {e}")))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600)).map_err(|e| {
            SealVaultError::SealingKey(format!("failed to set sealing key permissions: {e}"))
        })?;
    }

    Ok(key)
}

/// Read and length-check a sealing key.
pub fn load_sealing_key(path: &Path) -> Result<Zeroizing<Vec<u8>>> {
    let data = Zeroizing::new(fs::read(path).map_err(|e| {
        SealVaultError::SealingKey(format!("cannot read {}: {e}", path.display()))
    })?);

    if data.len() != SEALING_KEY_LEN {
        return Err(SealVaultError::SealingKey(format!(
            "sealing key must be exactly {SEALING_KEY_LEN} bytes, got {}",
            data.len()
        )));
    }
    Ok(data)
}

/// Short hex fingerprint for display; never the key itself.
pub fn fingerprint(key: &[u8]) -> String {
    hex::encode(&Sha256::digest(key)[..8])
}
