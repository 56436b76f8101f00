//! Random value generation for rotated keys.
//!
//! Values come straight from the OS entropy source. A generator kind
//! only decides how the raw bytes are encoded.

use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rand::rngs::OsRng;
use rand::TryRngCore;
use zeroize::Zeroizing;

use crate::errors::{Result, SealVaultError};
use crate::metadata::GeneratorSpec;

/// Byte length used when a spec leaves it unset (or zero).
pub const DEFAULT_BYTE_LENGTH: usize = 32;

/// How generated bytes are encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratorKind {
    /// The bytes as-is.
    Raw,
    /// Lowercase hex, two characters per byte.
    Hex,
    /// Standard-alphabet base64 with padding.
    Base64,
}

impl FromStr for GeneratorKind {
    type Err = SealVaultError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "raw" | "bytes" => Ok(Self::Raw),
            "hex" => Ok(Self::Hex),
            "base64" => Ok(Self::Base64),
            other => Err(SealVaultError::UnsupportedGeneratorKind(other.to_string())),
        }
    }
}

impl fmt::Display for GeneratorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Raw => "raw",
            Self::Hex => "hex",
            Self::Base64 => "base64",
        })
    }
}

/// Generate `byte_length` random bytes (32 when zero) encoded per `kind`.
pub fn generate(kind: GeneratorKind, byte_length: usize) -> Result<Zeroizing<Vec<u8>>> {
    let len = if byte_length == 0 {
        DEFAULT_BYTE_LENGTH
    } else {
        byte_length
    };

    let mut raw = Zeroizing::new(vec![0u8; len]);
    OsRng
        .try_fill_bytes(&mut raw)
        .map_err(|e| SealVaultError::RandomSource(e.to_string()))?;

    let encoded = match kind {
        GeneratorKind::Raw => raw,
        GeneratorKind::Hex => Zeroizing::new(hex::encode(raw.as_slice()).into_bytes()),
        GeneratorKind::Base64 => Zeroizing::new(BASE64.encode(raw.as_slice()).into_bytes()),
    };
    Ok(encoded)
}

/// Generate a value from a metadata generator spec.
pub fn generate_from_spec(spec: &GeneratorSpec) -> Result<Zeroizing<Vec<u8>>> {
    let kind: GeneratorKind = spec.kind.parse()?;
    generate(kind, spec.bytes.unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_has_requested_length() {
        let value = generate(GeneratorKind::Raw, 16).unwrap();
        assert_eq!(value.len(), 16);
    }

    #[test]
    fn zero_length_defaults_to_32_bytes() {
        let value = generate(GeneratorKind::Raw, 0).unwrap();
        assert_eq!(value.len(), DEFAULT_BYTE_LENGTH);
    }

    #[test]
    fn hex_encodes_two_chars_per_byte() {
        let value = generate(GeneratorKind::Hex, 20).unwrap();
        assert_eq!(value.len(), 40);
        assert!(value.iter().all(u8::is_ascii_hexdigit));
    }

    #[test]
    fn base64_decodes_back_to_requested_length() {
        let value = generate(GeneratorKind::Base64, 24).unwrap();
        let decoded = BASE64.decode(value.as_slice()).unwrap();
        assert_eq!(decoded.len(), 24);
    }

    #[test]
    fn consecutive_values_differ() {
        for kind in [GeneratorKind::Raw, GeneratorKind::Hex, GeneratorKind::Base64] {
            let a = generate(kind, 32).unwrap();
            let b = generate(kind, 32).unwrap();
            assert_ne!(a, b, "{kind} values must differ");
        }
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let err = "uuid".parse::<GeneratorKind>().unwrap_err();
        assert!(matches!(err, SealVaultError::UnsupportedGeneratorKind(ref k) if k == "uuid"));
    }

    #[test]
    fn spec_uses_default_length_when_unset() {
        let spec = GeneratorSpec {
            kind: "hex".into(),
            bytes: None,
        };
        assert_eq!(generate_from_spec(&spec).unwrap().len(), 64);
    }
}
