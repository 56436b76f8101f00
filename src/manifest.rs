//! SealedSecret manifests on disk.
//!
//! Only `spec.encryptedData` is ever rewritten. Everything else in an
//! existing manifest, including fields this model does not know about,
//! is carried through unchanged.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use crate::atomic::AtomicWriter;
use crate::errors::{Result, SealVaultError};
use crate::metadata::{SealScope, SecretMetadata};

pub const API_VERSION: &str = "bitnami.com/v1alpha1";
pub const KIND: &str = "SealedSecret";
pub const NAMESPACE_WIDE_ANNOTATION: &str = "sealedsecrets.bitnami.com/namespace-wide";
pub const CLUSTER_WIDE_ANNOTATION: &str = "sealedsecrets.bitnami.com/cluster-wide";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SealedSecretManifest {
    pub api_version: String,
    pub kind: String,
    pub metadata: ManifestMetadata,
    pub spec: ManifestSpec,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestMetadata {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestSpec {
    #[serde(default)]
    pub encrypted_data: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<ManifestTemplate>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestTemplate {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub secret_type: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Keys that differ between metadata and a manifest, each list sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Drift {
    /// Declared in metadata, absent from `encryptedData`.
    pub missing: Vec<String>,
    /// Present in `encryptedData`, not declared in metadata.
    pub extra: Vec<String>,
}

impl Drift {
    pub fn is_clean(&self) -> bool {
        self.missing.is_empty() && self.extra.is_empty()
    }
}

impl SealedSecretManifest {
    /// An empty manifest for `secret`, annotated for its scope.
    pub fn new_for(secret: &SecretMetadata) -> Self {
        let sealed = &secret.sealed_secret;
        let mut annotations = BTreeMap::new();
        match sealed.scope {
            SealScope::Strict => {}
            SealScope::NamespaceWide => {
                annotations.insert(NAMESPACE_WIDE_ANNOTATION.to_string(), "true".to_string());
            }
            SealScope::ClusterWide => {
                annotations.insert(CLUSTER_WIDE_ANNOTATION.to_string(), "true".to_string());
            }
        }

        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            metadata: ManifestMetadata {
                name: sealed.name.clone(),
                namespace: Some(sealed.namespace.clone()),
                annotations,
                extra: BTreeMap::new(),
            },
            spec: ManifestSpec {
                encrypted_data: BTreeMap::new(),
                template: Some(ManifestTemplate {
                    secret_type: Some(sealed.secret_type.clone()),
                    extra: BTreeMap::new(),
                }),
                extra: BTreeMap::new(),
            },
            extra: BTreeMap::new(),
        }
    }

    pub fn from_yaml(path: &Path, contents: &str) -> Result<Self> {
        let manifest: Self =
            serde_yaml::from_str(contents).map_err(|e| SealVaultError::InvalidManifest {
                path: path.to_path_buf(),
                detail: e.to_string(),
            })?;
        if manifest.kind != KIND {
            return Err(SealVaultError::InvalidManifest {
                path: path.to_path_buf(),
                detail: format!("expected kind {KIND}, found {}", manifest.kind),
            });
        }
        Ok(manifest)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| SealVaultError::InvalidManifest {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;
        Self::from_yaml(path, &contents)
    }

    /// Load the manifest at `path`, or start a fresh one for `secret`.
    pub fn load_or_new(path: &Path, secret: &SecretMetadata) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::new_for(secret))
        }
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self)
            .map_err(|e| SealVaultError::SerializationError(format!("manifest YAML: {e}")))
    }

    pub fn save(&self, path: &Path, writer: &dyn AtomicWriter) -> Result<()> {
        writer.write(path, self.to_yaml()?.as_bytes())
    }

    /// Overwrite the given keys; all other entries stay as they are.
    pub fn merge_encrypted<I>(&mut self, entries: I) -> usize
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut merged = 0;
        for (key, ciphertext) in entries {
            self.spec.encrypted_data.insert(key, ciphertext);
            merged += 1;
        }
        merged
    }

    pub fn drift(&self, secret: &SecretMetadata) -> Drift {
        let mut missing: Vec<String> = secret
            .keys
            .iter()
            .filter(|k| !self.spec.encrypted_data.contains_key(&k.key_name))
            .map(|k| k.key_name.clone())
            .collect();
        missing.sort();

        // BTreeMap iteration is already ordered.
        let extra = self
            .spec
            .encrypted_data
            .keys()
            .filter(|name| secret.key(name).is_none())
            .cloned()
            .collect();

        Drift { missing, extra }
    }

    /// Describe a name or namespace mismatch against `secret`, if any.
    pub fn identity_mismatch(&self, secret: &SecretMetadata) -> Option<String> {
        let want = &secret.sealed_secret;
        if self.metadata.name != want.name {
            return Some(format!(
                "manifest name '{}' does not match '{}'",
                self.metadata.name, want.name
            ));
        }
        match self.metadata.namespace.as_deref() {
            Some(ns) if ns != want.namespace => Some(format!(
                "manifest namespace '{ns}' does not match '{}'",
                want.namespace
            )),
            _ => None,
        }
    }
}
