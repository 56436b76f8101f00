//! AES-256-GCM authenticated encryption.
//!
//! Every ciphertext is bound to a context string passed as associated
//! data: a store resource name or a sealing label. Decrypting under a
//! different context fails authentication, so a value copied between
//! resources (or between scopes) is rejected instead of silently accepted.
//!
//! Output layout:
//!   [ 12-byte nonce | ciphertext + 16-byte auth tag ]

use aes_gcm::aead::{Aead, KeyInit, OsRng, Payload};
use aes_gcm::{AeadCore, Aes256Gcm, Nonce};
use zeroize::Zeroizing;

use crate::errors::{Result, SealVaultError};

/// Size of the AES-256-GCM nonce in bytes.
pub const NONCE_LEN: usize = 12;

/// Encrypt `plaintext` under a 32-byte `key`, bound to `context`.
pub fn encrypt(key: &[u8], plaintext: &[u8], context: &[u8]) -> Result<Vec<u8>> {
    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|e| SealVaultError::EncryptionFailed(format!("invalid key length: {e}")))?;

    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
    let sealed = cipher
        .encrypt(
            &nonce,
            Payload {
                msg: plaintext,
                aad: context,
            },
        )
        .map_err(|e| SealVaultError::EncryptionFailed(format!("encryption error: {e}")))?;

    let mut output = Vec::with_capacity(NONCE_LEN + sealed.len());
    output.extend_from_slice(&nonce);
    output.extend_from_slice(&sealed);
    Ok(output)
}

/// Decrypt a buffer produced by `encrypt` with the same key and context.
pub fn decrypt(key: &[u8], data: &[u8], context: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
    if data.len() < NONCE_LEN {
        return Err(SealVaultError::DecryptionFailed);
    }
    let (nonce_bytes, sealed) = data.split_at(NONCE_LEN);

    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| SealVaultError::DecryptionFailed)?;
    let plaintext = cipher
        .decrypt(
            Nonce::from_slice(nonce_bytes),
            Payload {
                msg: sealed,
                aad: context,
            },
        )
        .map_err(|_| SealVaultError::DecryptionFailed)?;

    Ok(Zeroizing::new(plaintext))
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: [u8; 32] = [7u8; 32];

    #[test]
    fn roundtrip_with_matching_context() {
        let sealed = encrypt(&KEY, b"hunter2", b"db-password").unwrap();
        assert_eq!(sealed.len(), NONCE_LEN + 7 + 16);
        let opened = decrypt(&KEY, &sealed, b"db-password").unwrap();
        assert_eq!(opened.as_slice(), b"hunter2");
    }

    #[test]
    fn nonces_differ_between_calls() {
        let a = encrypt(&KEY, b"same", b"ctx").unwrap();
        let b = encrypt(&KEY, b"same", b"ctx").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn wrong_context_is_rejected() {
        let sealed = encrypt(&KEY, b"value", b"default/app").unwrap();
        assert!(matches!(
            decrypt(&KEY, &sealed, b"other/app"),
            Err(SealVaultError::DecryptionFailed)
        ));
    }

    #[test]
    fn wrong_key_and_short_input_are_rejected() {
        let sealed = encrypt(&KEY, b"value", b"ctx").unwrap();
        assert!(decrypt(&[8u8; 32], &sealed, b"ctx").is_err());
        assert!(decrypt(&KEY, &sealed[..5], b"ctx").is_err());
    }

    #[test]
    fn bad_key_length_fails_encryption() {
        assert!(matches!(
            encrypt(&[1u8; 16], b"x", b""),
            Err(SealVaultError::EncryptionFailed(_))
        ));
    }
}
