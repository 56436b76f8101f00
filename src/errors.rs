use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// All errors that can occur in SealVault.
#[derive(Debug, Error)]
pub enum SealVaultError {
    // --- Resolution errors ---
    #[error("cyclic dependency in '{secret}': {}", .cycle.join(" -> "))]
    CyclicDependency { secret: String, cycle: Vec<String> },

    #[error("key '{key}' in '{secret}' references unknown key '{reference}'")]
    UnknownReference {
        secret: String,
        key: String,
        reference: String,
    },

    #[error("missing template variable(s): {}", .0.join(", "))]
    MissingTemplateVariable(Vec<String>),

    #[error("invalid payload format: {0}")]
    InvalidPayloadFormat(String),

    // --- Generator errors ---
    #[error("unsupported generator kind '{0}' (expected raw, hex or base64)")]
    UnsupportedGeneratorKind(String),

    #[error("random source unavailable: {0}")]
    RandomSource(String),

    // --- Store errors ---
    #[error("store read failed for '{resource}': {detail}")]
    StoreRead { resource: String, detail: String },

    #[error("secret '{resource}' version {version} not found")]
    SecretVersionNotFound { resource: String, version: String },

    #[error("store write failed for '{resource}': {detail}")]
    StoreWrite { resource: String, detail: String },

    #[error("Invalid store format: {0}")]
    InvalidStoreFormat(String),

    #[error("HMAC verification failed: store file was tampered with or the password is wrong")]
    HmacMismatch,

    // --- Sealing errors ---
    #[error("sealing '{key}' failed: {detail}")]
    Seal { key: String, detail: String },

    #[error("Sealing key error: {0}")]
    SealingKey(String),

    // --- Crypto errors ---
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Decryption failed: wrong key or corrupted data")]
    DecryptionFailed,

    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),

    // --- Metadata and manifest errors ---
    #[error("invalid metadata: {0}")]
    InvalidMetadata(String),

    #[error("no metadata for secret '{0}'")]
    MetadataNotFound(String),

    #[error("invalid manifest {path}: {detail}")]
    InvalidManifest { path: PathBuf, detail: String },

    #[error("writing {path} failed: {detail}")]
    ManifestWrite { path: PathBuf, detail: String },

    #[error("saving metadata {path} failed: {detail}")]
    MetadataWrite { path: PathBuf, detail: String },

    #[error("key '{key}' in '{secret}' cannot be rotated: {reason}")]
    RotationNotSupported {
        secret: String,
        key: String,
        reason: String,
    },

    #[error("reseal {short_name}: {}: {source}", .source.kind())]
    Reseal {
        short_name: String,
        #[source]
        source: Box<SealVaultError>,
    },

    #[error("operation cancelled")]
    Cancelled,

    // --- Config errors ---
    #[error("Config file error: {0}")]
    ConfigError(String),

    // --- IO errors ---
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // --- Serialization errors ---
    #[error("Serialization error: {0}")]
    SerializationError(String),

    // --- CLI errors ---
    #[error("Command failed: {0}")]
    CommandFailed(String),

    #[error("User cancelled operation")]
    UserCancelled,

    #[error("Audit error: {0}")]
    AuditError(String),
}

/// Operator-facing error taxonomy.
///
/// Several variants collapse onto one kind (a missing store version is a
/// `StoreReadError` to whoever reads the report).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    CyclicDependency,
    UnknownReference,
    MissingTemplateVariable,
    InvalidPayloadFormat,
    UnsupportedGeneratorKind,
    RandomSourceError,
    StoreReadError,
    StoreWriteError,
    SealError,
    ManifestWriteError,
    MetadataWriteError,
    InvalidMetadata,
    RotationNotSupported,
    Cancelled,
    Other,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::CyclicDependency => "CyclicDependency",
            Self::UnknownReference => "UnknownReference",
            Self::MissingTemplateVariable => "MissingTemplateVariable",
            Self::InvalidPayloadFormat => "InvalidPayloadFormat",
            Self::UnsupportedGeneratorKind => "UnsupportedGeneratorKind",
            Self::RandomSourceError => "RandomSourceError",
            Self::StoreReadError => "StoreReadError",
            Self::StoreWriteError => "StoreWriteError",
            Self::SealError => "SealError",
            Self::ManifestWriteError => "ManifestWriteError",
            Self::MetadataWriteError => "MetadataWriteError",
            Self::InvalidMetadata => "InvalidMetadata",
            Self::RotationNotSupported => "RotationNotSupported",
            Self::Cancelled => "Cancelled",
            Self::Other => "Error",
        };
        f.write_str(name)
    }
}

impl SealVaultError {
    /// Classify this error for reports and status lines.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::CyclicDependency { .. } => ErrorKind::CyclicDependency,
            Self::UnknownReference { .. } => ErrorKind::UnknownReference,
            Self::MissingTemplateVariable(_) => ErrorKind::MissingTemplateVariable,
            Self::InvalidPayloadFormat(_) => ErrorKind::InvalidPayloadFormat,
            Self::UnsupportedGeneratorKind(_) => ErrorKind::UnsupportedGeneratorKind,
            Self::RandomSource(_) => ErrorKind::RandomSourceError,
            Self::StoreRead { .. }
            | Self::SecretVersionNotFound { .. }
            | Self::InvalidStoreFormat(_)
            | Self::HmacMismatch
            | Self::DecryptionFailed => ErrorKind::StoreReadError,
            Self::StoreWrite { .. } => ErrorKind::StoreWriteError,
            Self::Seal { .. } | Self::SealingKey(_) | Self::EncryptionFailed(_) => {
                ErrorKind::SealError
            }
            Self::ManifestWrite { .. } => ErrorKind::ManifestWriteError,
            Self::MetadataWrite { .. } => ErrorKind::MetadataWriteError,
            Self::InvalidMetadata(_) | Self::MetadataNotFound(_) | Self::InvalidManifest { .. } => {
                ErrorKind::InvalidMetadata
            }
            Self::RotationNotSupported { .. } => ErrorKind::RotationNotSupported,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Reseal { source, .. } => source.kind(),
            _ => ErrorKind::Other,
        }
    }

    /// Structural errors are deterministic given the metadata and are never retried.
    pub fn is_structural(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::CyclicDependency | ErrorKind::UnknownReference | ErrorKind::InvalidMetadata
        )
    }
}

/// Convenience type alias for SealVault results.
pub type Result<T> = std::result::Result<T, SealVaultError>;
