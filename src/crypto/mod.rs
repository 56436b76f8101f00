//! Cryptographic primitives for SealVault.
//!
//! This module provides:
//! - AES-256-GCM encryption bound to associated data (`encryption`)
//! - Argon2id password-based key derivation for the local store (`kdf`)
//! - HKDF sub-key derivation for store resources, integrity and sealing (`keys`)
//! - The on-disk sealing key used by the local sealer (`sealing_key`)

pub mod encryption;
pub mod kdf;
pub mod keys;
pub mod sealing_key;

pub use encryption::{decrypt, encrypt};
pub use kdf::{derive_store_key, generate_salt, Argon2Params};
pub use keys::{derive_hmac_key, derive_resource_key, derive_seal_key, StoreKey};
pub use sealing_key::{fingerprint, generate_sealing_key, load_sealing_key};
