//! Sealer backed by a local sealing key.
//!
//! For every scope label an AES-256-GCM key is derived from the sealing
//! key with HKDF, and the label is also passed as associated data. Output
//! is `base64(nonce || ciphertext)`. Only holders of the sealing key can
//! unseal, and a value sealed for one label does not open under another.

use std::path::Path;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use zeroize::Zeroizing;

use crate::crypto::{decrypt, derive_seal_key, encrypt, fingerprint, load_sealing_key};
use crate::errors::{Result, SealVaultError};
use crate::metadata::SealScope;

use super::{scope_label, Sealer};

pub struct LocalSealer {
    key: Zeroizing<Vec<u8>>,
}

impl LocalSealer {
    pub fn new(key: Zeroizing<Vec<u8>>) -> Self {
        Self { key }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        Ok(Self::new(load_sealing_key(path)?))
    }

    /// Fingerprint of the sealing key, safe to print.
    pub fn fingerprint(&self) -> String {
        fingerprint(&self.key)
    }

    /// Reverse `seal`.
    pub fn unseal(
        &self,
        secret_name: &str,
        namespace: &str,
        ciphertext: &str,
        scope: SealScope,
    ) -> Result<Zeroizing<Vec<u8>>> {
        let label = scope_label(secret_name, namespace, scope);
        let raw = BASE64
            .decode(ciphertext.trim())
            .map_err(|_| SealVaultError::DecryptionFailed)?;
        let key = derive_seal_key(&self.key, &label)?;
        decrypt(key.as_ref(), &raw, label.as_bytes())
    }
}

impl Sealer for LocalSealer {
    fn seal(
        &self,
        secret_name: &str,
        namespace: &str,
        key_name: &str,
        plaintext: &[u8],
        scope: SealScope,
    ) -> Result<String> {
        let label = scope_label(secret_name, namespace, scope);
        let seal_err = |detail: String| SealVaultError::Seal {
            key: key_name.to_string(),
            detail,
        };

        let key = derive_seal_key(&self.key, &label).map_err(|e| seal_err(e.to_string()))?;
        let sealed =
            encrypt(key.as_ref(), plaintext, label.as_bytes()).map_err(|e| seal_err(e.to_string()))?;
        Ok(BASE64.encode(sealed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sealer() -> LocalSealer {
        LocalSealer::new(Zeroizing::new(vec![0x42; 32]))
    }

    #[test]
    fn seal_then_unseal() {
        let s = sealer();
        let ct = s
            .seal("app", "prod", "password", b"hunter2", SealScope::Strict)
            .unwrap();
        assert!(!ct.contains("hunter2"));
        let pt = s.unseal("app", "prod", &ct, SealScope::Strict).unwrap();
        assert_eq!(pt.as_slice(), b"hunter2");
    }

    #[test]
    fn strict_scope_binds_name_and_namespace() {
        let s = sealer();
        let ct = s.seal("app", "prod", "k", b"v", SealScope::Strict).unwrap();
        assert!(s.unseal("other", "prod", &ct, SealScope::Strict).is_err());
        assert!(s.unseal("app", "dev", &ct, SealScope::Strict).is_err());
    }

    #[test]
    fn namespace_wide_ignores_name() {
        let s = sealer();
        let ct = s
            .seal("app", "prod", "k", b"v", SealScope::NamespaceWide)
            .unwrap();
        let pt = s
            .unseal("renamed", "prod", &ct, SealScope::NamespaceWide)
            .unwrap();
        assert_eq!(pt.as_slice(), b"v");
        assert!(s.unseal("app", "dev", &ct, SealScope::NamespaceWide).is_err());
    }

    #[test]
    fn cluster_wide_opens_anywhere() {
        let s = sealer();
        let ct = s.seal("a", "x", "k", b"v", SealScope::ClusterWide).unwrap();
        assert!(s.unseal("b", "y", &ct, SealScope::ClusterWide).is_ok());
    }

    #[test]
    fn ciphertext_differs_each_time() {
        let s = sealer();
        let a = s.seal("a", "n", "k", b"same", SealScope::Strict).unwrap();
        let b = s.seal("a", "n", "k", b"same", SealScope::Strict).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn other_sealing_key_cannot_unseal() {
        let ct = sealer().seal("a", "n", "k", b"v", SealScope::Strict).unwrap();
        let other = LocalSealer::new(Zeroizing::new(vec![0x43; 32]));
        assert!(other.unseal("a", "n", &ct, SealScope::Strict).is_err());
    }
}
