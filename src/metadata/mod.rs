//! Metadata: what each managed secret consists of.
//!
//! This module provides:
//! - The typed model (`SecretMetadata`, `KeyMetadata`, `KeySource`, ...) (`model`)
//! - The one-file-per-secret YAML store (`store`)

pub mod model;
pub mod store;

pub use model::{
    validate_short_name, ComputedInput, ComputedSpec, Expiry, GeneratorSpec, GsmRef, GsmVersion,
    KeyMetadata, KeySource, OperatorHints, Retirement, Rotation, RotationMode, SealScope,
    SealedSecretRef, SecretMetadata, SecretStatus,
};
pub use store::MetadataStore;
