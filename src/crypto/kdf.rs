//! Password-based key derivation for the local store.
//!
//! The store password is stretched with Argon2id. Parameters come from
//! `Settings` so tests and CI can choose a cheaper (but still bounded)
//! cost than interactive use.

use argon2::{Algorithm, Argon2, Params, Version};
use rand::rngs::OsRng;
use rand::TryRngCore;
use serde::{Deserialize, Serialize};

use crate::errors::{Result, SealVaultError};

use super::keys::StoreKey;

/// Length of the salt in bytes.
pub const SALT_LEN: usize = 32;

const KEY_LEN: usize = 32;

/// Minimum memory cost in KiB (8 MB).
const MIN_MEMORY_KIB: u32 = 8_192;

/// Argon2id cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Argon2Params {
    /// Memory cost in KiB.
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for Argon2Params {
    fn default() -> Self {
        Self {
            memory_kib: 65_536,
            iterations: 3,
            parallelism: 4,
        }
    }
}

impl Argon2Params {
    /// Reject parameters below the enforced floor.
    pub fn check(&self) -> Result<()> {
        if self.memory_kib < MIN_MEMORY_KIB {
            return Err(SealVaultError::KeyDerivationFailed(format!(
                "Argon2 memory_kib must be at least {MIN_MEMORY_KIB} (got {})",
                self.memory_kib
            )));
        }
        if self.iterations == 0 || self.parallelism == 0 {
            return Err(SealVaultError::KeyDerivationFailed(
                "Argon2 iterations and parallelism must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Derive the store key from a password and salt.
///
/// Same password, salt and parameters always give the same key.
pub fn derive_store_key(password: &[u8], salt: &[u8], params: &Argon2Params) -> Result<StoreKey> {
    params.check()?;

    let argon_params = Params::new(
        params.memory_kib,
        params.iterations,
        params.parallelism,
        Some(KEY_LEN),
    )
    .map_err(|e| SealVaultError::KeyDerivationFailed(format!("invalid Argon2 params: {e}")))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon_params);

    let mut key = StoreKey::new([0u8; KEY_LEN]);
    argon2
        .hash_password_into(password, salt, key.as_mut_bytes())
        .map_err(|e| SealVaultError::KeyDerivationFailed(format!("Argon2id hashing failed: {e}")))?;

    Ok(key)
}

/// Generate a random salt from the OS source.
pub fn generate_salt() -> Result<[u8; SALT_LEN]> {
    let mut salt = [0u8; SALT_LEN];
    OsRng
        .try_fill_bytes(&mut salt)
        .map_err(|e| SealVaultError::RandomSource(e.to_string()))?;
    Ok(salt)
}
