//! Binary file format of the local store, with HMAC integrity.
//!
//! ```text
//! [SVST: 4 bytes][version: 1 byte][header_len: 4 bytes LE][header JSON][resources JSON][HMAC-SHA256: 32 bytes]
//! ```
//!
//! The HMAC covers the header and resources bytes exactly as stored, so
//! verification never depends on re-serializing.

use std::path::Path;

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::crypto::Argon2Params;
use crate::errors::{Result, SealVaultError};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

const MAGIC: &[u8; 4] = b"SVST";

pub const CURRENT_VERSION: u8 = 1;

const HMAC_LEN: usize = 32;

/// Magic + version + header length.
const PREFIX_LEN: usize = 9;

// ---------------------------------------------------------------------------
// On-disk records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreHeader {
    pub version: u8,

    /// Argon2id salt, base64 in JSON.
    #[serde(serialize_with = "base64_encode", deserialize_with = "base64_decode")]
    pub salt: Vec<u8>,

    pub created_at: DateTime<Utc>,

    /// Cost parameters the store key was derived with.
    pub argon2_params: Argon2Params,
}

/// One encrypted version of a resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredVersion {
    pub version: u64,
    pub created_at: DateTime<Utc>,
    /// nonce || ciphertext, bound to `<resource>#<version>`.
    #[serde(serialize_with = "base64_encode", deserialize_with = "base64_decode")]
    pub ciphertext: Vec<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredResource {
    pub name: String,
    pub versions: Vec<StoredVersion>,
}

/// A parsed store file plus the raw bytes its HMAC covers.
pub struct RawStore {
    pub header: StoreHeader,
    pub resources: Vec<StoredResource>,
    pub header_bytes: Vec<u8>,
    pub resources_bytes: Vec<u8>,
    pub stored_hmac: Vec<u8>,
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// Serialize a store and append its HMAC.
pub fn encode_store(
    header: &StoreHeader,
    resources: &[StoredResource],
    hmac_key: &[u8],
) -> Result<Vec<u8>> {
    let header_bytes = serde_json::to_vec(header)
        .map_err(|e| SealVaultError::SerializationError(format!("store header: {e}")))?;
    let resources_bytes = serde_json::to_vec(resources)
        .map_err(|e| SealVaultError::SerializationError(format!("store resources: {e}")))?;

    let tag = compute_hmac(hmac_key, &header_bytes, &resources_bytes)?;

    let header_len = u32::try_from(header_bytes.len()).map_err(|_| {
        SealVaultError::SerializationError(format!(
            "header length {} exceeds u32::MAX",
            header_bytes.len()
        ))
    })?;

    let mut buf =
        Vec::with_capacity(PREFIX_LEN + header_bytes.len() + resources_bytes.len() + HMAC_LEN);
    buf.extend_from_slice(MAGIC);
    buf.push(CURRENT_VERSION);
    buf.extend_from_slice(&header_len.to_le_bytes());
    buf.extend_from_slice(&header_bytes);
    buf.extend_from_slice(&resources_bytes);
    buf.extend_from_slice(&tag);
    Ok(buf)
}

/// Split and parse a store file. The HMAC is not checked here; the
/// caller verifies it once the key is derived.
pub fn decode_store(data: &[u8]) -> Result<RawStore> {
    if data.len() < PREFIX_LEN + HMAC_LEN {
        return Err(SealVaultError::InvalidStoreFormat(
            "file too small to be a store".into(),
        ));
    }
    if &data[0..4] != MAGIC {
        return Err(SealVaultError::InvalidStoreFormat(
            "missing SVST magic bytes".into(),
        ));
    }
    let version = data[4];
    if version != CURRENT_VERSION {
        return Err(SealVaultError::InvalidStoreFormat(format!(
            "unsupported version {version}, expected {CURRENT_VERSION}"
        )));
    }

    let header_len = u32::from_le_bytes([data[5], data[6], data[7], data[8]]) as usize;
    let header_end = PREFIX_LEN
        .checked_add(header_len)
        .filter(|end| end + HMAC_LEN <= data.len())
        .ok_or_else(|| {
            SealVaultError::InvalidStoreFormat("header length exceeds file size".into())
        })?;

    let header_bytes = data[PREFIX_LEN..header_end].to_vec();
    let resources_end = data.len() - HMAC_LEN;
    let resources_bytes = data[header_end..resources_end].to_vec();
    let stored_hmac = data[resources_end..].to_vec();

    let header: StoreHeader = serde_json::from_slice(&header_bytes)
        .map_err(|e| SealVaultError::InvalidStoreFormat(format!("header JSON: {e}")))?;
    let resources: Vec<StoredResource> = serde_json::from_slice(&resources_bytes)
        .map_err(|e| SealVaultError::InvalidStoreFormat(format!("resources JSON: {e}")))?;

    Ok(RawStore {
        header,
        resources,
        header_bytes,
        resources_bytes,
        stored_hmac,
    })
}

/// Read and split a store file from disk.
pub fn read_store(path: &Path) -> Result<RawStore> {
    let data = std::fs::read(path).map_err(|e| SealVaultError::StoreRead {
        resource: path.display().to_string(),
        detail: e.to_string(),
    })?;
    decode_store(&data)
}

pub fn compute_hmac(key: &[u8], header: &[u8], resources: &[u8]) -> Result<Vec<u8>> {
    let mut mac = Hmac::<Sha256>::new_from_slice(key)
        .map_err(|e| SealVaultError::KeyDerivationFailed(format!("invalid HMAC key: {e}")))?;
    mac.update(header);
    mac.update(resources);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Constant-time HMAC check.
pub fn verify_hmac(key: &[u8], header: &[u8], resources: &[u8], expected: &[u8]) -> Result<()> {
    let mut mac = Hmac::<Sha256>::new_from_slice(key)
        .map_err(|e| SealVaultError::KeyDerivationFailed(format!("invalid HMAC key: {e}")))?;
    mac.update(header);
    mac.update(resources);
    mac.verify_slice(expected)
        .map_err(|_| SealVaultError::HmacMismatch)
}

// ---------------------------------------------------------------------------
// Serde helpers for base64-encoded byte fields
// ---------------------------------------------------------------------------

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

fn base64_encode<S>(data: &[u8], serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&BASE64.encode(data))
}

fn base64_decode<'de, D>(deserializer: D) -> std::result::Result<Vec<u8>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    BASE64.decode(&s).map_err(serde::de::Error::custom)
}
