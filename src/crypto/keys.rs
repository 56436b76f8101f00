//! HKDF-SHA256 sub-key derivation.
//!
//! One root key fans out into independent sub-keys, each bound to an
//! `info` string:
//! - `sealvault-resource:<name>` encrypts one store resource
//! - `sealvault-hmac-key` authenticates the whole store file
//! - `sealvault-seal:<label>` seals values for one scope label

use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::{Zeroize, Zeroizing};

use crate::errors::{Result, SealVaultError};

const KEY_LEN: usize = 32;

/// Key for a single store resource.
pub fn derive_resource_key(root: &[u8], resource: &str) -> Result<Zeroizing<[u8; KEY_LEN]>> {
    hkdf_expand(root, format!("sealvault-resource:{resource}").as_bytes())
}

/// Key for the store file's integrity trailer.
pub fn derive_hmac_key(root: &[u8]) -> Result<Zeroizing<[u8; KEY_LEN]>> {
    hkdf_expand(root, b"sealvault-hmac-key")
}

/// Key for sealing under one scope label.
pub fn derive_seal_key(root: &[u8], label: &str) -> Result<Zeroizing<[u8; KEY_LEN]>> {
    hkdf_expand(root, format!("sealvault-seal:{label}").as_bytes())
}

// Root keys already carry full entropy, so extract runs with no salt.
fn hkdf_expand(ikm: &[u8], info: &[u8]) -> Result<Zeroizing<[u8; KEY_LEN]>> {
    let hk = Hkdf::<Sha256>::new(None, ikm);
    let mut okm = Zeroizing::new([0u8; KEY_LEN]);
    hk.expand(info, okm.as_mut())
        .map_err(|e| SealVaultError::KeyDerivationFailed(format!("HKDF expand failed: {e}")))?;
    Ok(okm)
}

/// The Argon2-derived root key of a local store, wiped on drop.
#[derive(Zeroize)]
#[zeroize(drop)]
pub struct StoreKey {
    bytes: [u8; KEY_LEN],
}

impl StoreKey {
    pub fn new(bytes: [u8; KEY_LEN]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }

    pub(crate) fn as_mut_bytes(&mut self) -> &mut [u8; KEY_LEN] {
        &mut self.bytes
    }

    pub fn resource_key(&self, resource: &str) -> Result<Zeroizing<[u8; KEY_LEN]>> {
        derive_resource_key(&self.bytes, resource)
    }

    pub fn hmac_key(&self) -> Result<Zeroizing<[u8; KEY_LEN]>> {
        derive_hmac_key(&self.bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sub_keys_are_independent() {
        let root = [9u8; 32];
        let a = derive_resource_key(&root, "db-password").unwrap();
        let b = derive_resource_key(&root, "api-token").unwrap();
        let h = derive_hmac_key(&root).unwrap();
        let s = derive_seal_key(&root, "default/app").unwrap();
        assert_ne!(*a, *b);
        assert_ne!(*a, *h);
        assert_ne!(*h, *s);
    }

    #[test]
    fn derivation_is_stable() {
        let key = StoreKey::new([1u8; 32]);
        assert_eq!(*key.resource_key("x").unwrap(), *key.resource_key("x").unwrap());
    }
}
