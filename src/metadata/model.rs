//! Typed metadata for one GitOps-managed secret.
//!
//! On disk a key is described as `source: {kind: gsm|computed}` with
//! sibling `gsmRef` / `computed` blocks. In memory that becomes the
//! `KeySource` sum type, so the engine matches exhaustively instead of
//! dispatching on strings. Conversion happens through the `*Document`
//! types via `serde(try_from/into)`, and validation runs as part of it:
//! a `SecretMetadata` value that exists is a valid one.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{Result, SealVaultError};

/// Longest short name we accept (a Kubernetes object name limit).
const MAX_SHORT_NAME_LEN: usize = 253;

// ---------------------------------------------------------------------------
// Store references
// ---------------------------------------------------------------------------

/// A pinned, strictly numeric store version.
///
/// Mutable aliases such as `latest` are rejected at parse time so a
/// reseal always reproduces exactly what the metadata names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GsmVersion(String);

impl GsmVersion {
    pub fn parse(value: &str) -> Result<Self> {
        if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
            return Err(SealVaultError::InvalidMetadata(format!(
                "gsm version '{value}' must be numeric (aliases like 'latest' are not allowed)"
            )));
        }
        Ok(Self(value.to_string()))
    }

    pub fn from_number(number: u64) -> Self {
        Self(number.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Numeric value of the version; saturates on absurdly long digit strings.
    pub fn number(&self) -> u64 {
        self.0.parse().unwrap_or(u64::MAX)
    }
}

impl fmt::Display for GsmVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for GsmVersion {
    type Error = SealVaultError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<GsmVersion> for String {
    fn from(version: GsmVersion) -> Self {
        version.0
    }
}

/// A versioned entry in the external store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GsmRef {
    pub secret_resource: String,
    pub version: GsmVersion,
}

// ---------------------------------------------------------------------------
// SealedSecret binding
// ---------------------------------------------------------------------------

/// Binding granularity of a sealed value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SealScope {
    /// Bound to the exact name and namespace.
    #[default]
    Strict,
    /// Any name within the namespace.
    NamespaceWide,
    /// Anywhere in the cluster.
    ClusterWide,
}

impl SealScope {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Strict => "strict",
            Self::NamespaceWide => "namespace-wide",
            Self::ClusterWide => "cluster-wide",
        }
    }
}

impl fmt::Display for SealScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_secret_type() -> String {
    "Opaque".to_string()
}

/// Which Kubernetes Secret the manifest unseals into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SealedSecretRef {
    pub name: String,
    pub namespace: String,
    #[serde(default)]
    pub scope: SealScope,
    #[serde(rename = "type", default = "default_secret_type")]
    pub secret_type: String,
}

// ---------------------------------------------------------------------------
// Rotation, expiry, hints
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RotationMode {
    Static,
    Generated,
    External,
    #[default]
    Unknown,
}

impl RotationMode {
    /// The name used in metadata documents.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Static => "static",
            Self::Generated => "generated",
            Self::External => "external",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for RotationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a generated value is produced. `kind` is checked when the
/// generator runs, not at load time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratorSpec {
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bytes: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rotation {
    #[serde(default)]
    pub mode: RotationMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generator: Option<GeneratorSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Expiry {
    pub expires_at: DateTime<Utc>,
}

/// Advisory only; never evaluated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperatorHints {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gsm_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

// ---------------------------------------------------------------------------
// Key sources
// ---------------------------------------------------------------------------

/// One template variable bound to another key's value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComputedInput {
    pub variable_name: String,
    pub reference_key_name: String,
    /// Set when the referenced key lives in another secret.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_short_name: Option<String>,
}

impl ComputedInput {
    /// The secret this input points into, given the owner's short name.
    pub fn target_secret<'a>(&'a self, owner: &'a str) -> &'a str {
        self.reference_short_name.as_deref().unwrap_or(owner)
    }

    pub fn is_local(&self, owner: &str) -> bool {
        self.target_secret(owner) == owner
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComputedSpec {
    pub template: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inputs: Vec<ComputedInput>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, String>,
    /// Store entry holding a JSON payload for this key, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gsm_ref: Option<GsmRef>,
}

/// Where a key's plaintext comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySource {
    /// Stored directly in the external store.
    Gsm(GsmRef),
    /// Derived from other keys through a template.
    Computed(ComputedSpec),
}

// ---------------------------------------------------------------------------
// KeyMetadata
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "KeyDocument", into = "KeyDocument")]
pub struct KeyMetadata {
    pub key_name: String,
    pub source: KeySource,
    pub rotation: Rotation,
    pub expiry: Option<Expiry>,
    pub operator_hints: Option<OperatorHints>,
}

impl KeyMetadata {
    /// A key read straight from the store.
    pub fn gsm(key_name: &str, secret_resource: &str, version: u64) -> Self {
        Self {
            key_name: key_name.to_string(),
            source: KeySource::Gsm(GsmRef {
                secret_resource: secret_resource.to_string(),
                version: GsmVersion::from_number(version),
            }),
            rotation: Rotation::default(),
            expiry: None,
            operator_hints: None,
        }
    }

    /// A key derived from a template.
    pub fn computed(key_name: &str, spec: ComputedSpec) -> Self {
        Self {
            key_name: key_name.to_string(),
            source: KeySource::Computed(spec),
            rotation: Rotation::default(),
            expiry: None,
            operator_hints: None,
        }
    }

    pub fn is_computed(&self) -> bool {
        matches!(self.source, KeySource::Computed(_))
    }

    /// Inputs of a computed key; empty for gsm keys.
    pub fn inputs(&self) -> &[ComputedInput] {
        match &self.source {
            KeySource::Gsm(_) => &[],
            KeySource::Computed(spec) => &spec.inputs,
        }
    }

    /// The store entry this key is pinned to, if any.
    pub fn store_ref(&self) -> Option<&GsmRef> {
        match &self.source {
            KeySource::Gsm(gsm) => Some(gsm),
            KeySource::Computed(spec) => spec.gsm_ref.as_ref(),
        }
    }

    pub fn store_ref_mut(&mut self) -> Option<&mut GsmRef> {
        match &mut self.source {
            KeySource::Gsm(gsm) => Some(gsm),
            KeySource::Computed(spec) => spec.gsm_ref.as_mut(),
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expiry.as_ref().is_some_and(|e| e.expires_at <= now)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// True when the key expires within `days` of `now` (already expired
    /// keys count too). A window past the representable range covers every
    /// expiry when positive and none when negative.
    pub fn expires_within_days_at(&self, days: i64, now: DateTime<Utc>) -> bool {
        let limit = Duration::try_days(days).and_then(|window| now.checked_add_signed(window));
        self.expiry.as_ref().is_some_and(|e| match limit {
            Some(limit) => e.expires_at <= limit,
            None => days > 0,
        })
    }

    pub fn expires_within_days(&self, days: i64) -> bool {
        self.expires_within_days_at(days, Utc::now())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum SourceKind {
    Gsm,
    Computed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SourceDocument {
    kind: SourceKind,
}

/// On-disk shape of a key.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KeyDocument {
    key_name: String,
    source: SourceDocument,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    gsm_ref: Option<GsmRef>,
    #[serde(default)]
    rotation: Rotation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    computed: Option<ComputedSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expiry: Option<Expiry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    operator_hints: Option<OperatorHints>,
}

impl TryFrom<KeyDocument> for KeyMetadata {
    type Error = SealVaultError;

    fn try_from(doc: KeyDocument) -> Result<Self> {
        let source = match doc.source.kind {
            SourceKind::Gsm => {
                let gsm_ref = doc.gsm_ref.ok_or_else(|| {
                    SealVaultError::InvalidMetadata(format!(
                        "key '{}' has source gsm but no gsmRef",
                        doc.key_name
                    ))
                })?;
                KeySource::Gsm(gsm_ref)
            }
            SourceKind::Computed => {
                let computed = doc.computed.ok_or_else(|| {
                    SealVaultError::InvalidMetadata(format!(
                        "key '{}' has source computed but no computed block",
                        doc.key_name
                    ))
                })?;
                KeySource::Computed(computed)
            }
        };

        Ok(Self {
            key_name: doc.key_name,
            source,
            rotation: doc.rotation,
            expiry: doc.expiry,
            operator_hints: doc.operator_hints,
        })
    }
}

impl From<KeyMetadata> for KeyDocument {
    fn from(key: KeyMetadata) -> Self {
        let (kind, gsm_ref, computed) = match key.source {
            KeySource::Gsm(gsm) => (SourceKind::Gsm, Some(gsm), None),
            KeySource::Computed(spec) => (SourceKind::Computed, None, Some(spec)),
        };
        Self {
            key_name: key.key_name,
            source: SourceDocument { kind },
            gsm_ref,
            rotation: key.rotation,
            computed,
            expiry: key.expiry,
            operator_hints: key.operator_hints,
        }
    }
}

// ---------------------------------------------------------------------------
// SecretMetadata
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Retirement {
    pub retired_at: DateTime<Utc>,
    #[serde(default)]
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replaced_by: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretStatus {
    Active,
    Retired(Retirement),
}

/// Everything SealVault knows about one secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SecretDocument", into = "SecretDocument")]
pub struct SecretMetadata {
    pub short_name: String,
    pub manifest_path: PathBuf,
    pub sealed_secret: SealedSecretRef,
    pub status: SecretStatus,
    /// Declaration order; kept for serialization, irrelevant to evaluation.
    pub keys: Vec<KeyMetadata>,
}

impl SecretMetadata {
    /// Build and validate metadata from parts.
    pub fn new(
        short_name: &str,
        manifest_path: impl Into<PathBuf>,
        sealed_secret: SealedSecretRef,
        keys: Vec<KeyMetadata>,
    ) -> Result<Self> {
        let metadata = Self {
            short_name: short_name.to_string(),
            manifest_path: manifest_path.into(),
            sealed_secret,
            status: SecretStatus::Active,
            keys,
        };
        metadata.validate()?;
        Ok(metadata)
    }

    /// Parse a YAML metadata document.
    pub fn from_yaml(contents: &str) -> Result<Self> {
        serde_yaml::from_str(contents).map_err(|e| SealVaultError::InvalidMetadata(e.to_string()))
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self)
            .map_err(|e| SealVaultError::SerializationError(format!("metadata YAML: {e}")))
    }

    pub fn is_retired(&self) -> bool {
        matches!(self.status, SecretStatus::Retired(_))
    }

    pub fn key(&self, key_name: &str) -> Option<&KeyMetadata> {
        self.keys.iter().find(|k| k.key_name == key_name)
    }

    pub fn key_mut(&mut self, key_name: &str) -> Option<&mut KeyMetadata> {
        self.keys.iter_mut().find(|k| k.key_name == key_name)
    }

    pub fn is_expired(&self) -> bool {
        self.keys.iter().any(KeyMetadata::is_expired)
    }

    /// Keys expiring within `days` of `now`, in declaration order.
    pub fn expiring_keys_at(&self, days: i64, now: DateTime<Utc>) -> Vec<&KeyMetadata> {
        self.keys
            .iter()
            .filter(|k| k.expires_within_days_at(days, now))
            .collect()
    }

    pub fn expires_within_days(&self, days: i64) -> bool {
        !self.expiring_keys_at(days, Utc::now()).is_empty()
    }

    /// Names of other secrets this one pulls values from, sorted.
    pub fn external_references(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .keys
            .iter()
            .flat_map(KeyMetadata::inputs)
            .filter(|input| !input.is_local(&self.short_name))
            .map(|input| input.target_secret(&self.short_name))
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }

    /// Check the structural invariants.
    ///
    /// Cycles are not checked here; the resolver reports them with the
    /// offending key names when it orders the keys.
    pub fn validate(&self) -> Result<()> {
        validate_short_name(&self.short_name)?;

        if self.sealed_secret.name.trim().is_empty() {
            return Err(SealVaultError::InvalidMetadata(format!(
                "'{}': sealedSecret.name cannot be empty",
                self.short_name
            )));
        }
        if self.sealed_secret.namespace.trim().is_empty() {
            return Err(SealVaultError::InvalidMetadata(format!(
                "'{}': sealedSecret.namespace cannot be empty",
                self.short_name
            )));
        }

        let mut seen = HashSet::with_capacity(self.keys.len());
        for key in &self.keys {
            if key.key_name.is_empty() {
                return Err(SealVaultError::InvalidMetadata(format!(
                    "'{}': key name cannot be empty",
                    self.short_name
                )));
            }
            if !seen.insert(key.key_name.as_str()) {
                return Err(SealVaultError::InvalidMetadata(format!(
                    "'{}': duplicate key name '{}'",
                    self.short_name, key.key_name
                )));
            }
        }

        for key in &self.keys {
            if let KeySource::Computed(spec) = &key.source {
                if spec.template.is_empty() {
                    return Err(SealVaultError::InvalidMetadata(format!(
                        "'{}': computed key '{}' has an empty template",
                        self.short_name, key.key_name
                    )));
                }
            }
            for input in key.inputs() {
                if input.is_local(&self.short_name)
                    && !seen.contains(input.reference_key_name.as_str())
                {
                    return Err(SealVaultError::UnknownReference {
                        secret: self.short_name.clone(),
                        key: key.key_name.clone(),
                        reference: input.reference_key_name.clone(),
                    });
                }
            }
        }

        Ok(())
    }
}

/// Short names double as file names, so keep them boring.
pub fn validate_short_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(SealVaultError::InvalidMetadata(
            "shortName cannot be empty".into(),
        ));
    }
    if name.len() > MAX_SHORT_NAME_LEN {
        return Err(SealVaultError::InvalidMetadata(format!(
            "shortName cannot exceed {MAX_SHORT_NAME_LEN} characters"
        )));
    }
    if name.starts_with('.')
        || !name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_' || b == b'.')
    {
        return Err(SealVaultError::InvalidMetadata(format!(
            "shortName '{name}' is not filesystem-safe: use letters, digits, '-', '_' and '.'"
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum StatusDocument {
    #[default]
    Active,
    Retired,
}

/// On-disk shape of a secret.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SecretDocument {
    short_name: String,
    manifest_path: PathBuf,
    sealed_secret: SealedSecretRef,
    #[serde(default)]
    status: StatusDocument,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    retirement: Option<Retirement>,
    #[serde(default)]
    keys: Vec<KeyMetadata>,
}

impl TryFrom<SecretDocument> for SecretMetadata {
    type Error = SealVaultError;

    fn try_from(doc: SecretDocument) -> Result<Self> {
        let status = match (doc.status, doc.retirement) {
            (StatusDocument::Active, _) => SecretStatus::Active,
            (StatusDocument::Retired, Some(retirement)) => SecretStatus::Retired(retirement),
            (StatusDocument::Retired, None) => {
                return Err(SealVaultError::InvalidMetadata(format!(
                    "'{}' is retired but has no retirement block",
                    doc.short_name
                )));
            }
        };

        let metadata = Self {
            short_name: doc.short_name,
            manifest_path: doc.manifest_path,
            sealed_secret: doc.sealed_secret,
            status,
            keys: doc.keys,
        };
        metadata.validate()?;
        Ok(metadata)
    }
}

impl From<SecretMetadata> for SecretDocument {
    fn from(metadata: SecretMetadata) -> Self {
        let (status, retirement) = match metadata.status {
            SecretStatus::Active => (StatusDocument::Active, None),
            SecretStatus::Retired(r) => (StatusDocument::Retired, Some(r)),
        };
        Self {
            short_name: metadata.short_name,
            manifest_path: metadata.manifest_path,
            sealed_secret: metadata.sealed_secret,
            status,
            retirement,
            keys: metadata.keys,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const APP_DB: &str = r#"
shortName: app-db
manifestPath: manifests/app-db.yaml
sealedSecret:
  name: app-db
  namespace: payments
  scope: namespace-wide
keys:
  - keyName: password
    source: { kind: gsm }
    gsmRef: { secretResource: app-db-password, version: "3" }
    rotation:
      mode: generated
      generator: { kind: base64, bytes: 24 }
  - keyName: url
    source: { kind: computed }
    computed:
      template: "postgresql://{{user}}:{{pass}}@db:5432/app"
      inputs:
        - { variableName: pass, referenceKeyName: password }
      params: { user: app }
    expiry: { expiresAt: "2030-01-01T00:00:00Z" }
"#;

    #[test]
    fn parses_typed_sources() {
        let meta = SecretMetadata::from_yaml(APP_DB).unwrap();
        assert_eq!(meta.short_name, "app-db");
        assert_eq!(meta.sealed_secret.scope, SealScope::NamespaceWide);
        assert_eq!(meta.sealed_secret.secret_type, "Opaque");
        assert!(!meta.is_retired());

        match &meta.keys[0].source {
            KeySource::Gsm(gsm) => {
                assert_eq!(gsm.secret_resource, "app-db-password");
                assert_eq!(gsm.version.number(), 3);
            }
            other => panic!("expected gsm source, got {other:?}"),
        }
        assert_eq!(meta.keys[0].rotation.mode, RotationMode::Generated);
        assert!(meta.keys[1].is_computed());
        assert_eq!(meta.keys[1].inputs()[0].reference_key_name, "password");
    }

    #[test]
    fn yaml_roundtrip_keeps_shape() {
        let meta = SecretMetadata::from_yaml(APP_DB).unwrap();
        let yaml = meta.to_yaml().unwrap();
        assert!(yaml.contains("kind: gsm"));
        assert!(yaml.contains("kind: computed"));
        let again = SecretMetadata::from_yaml(&yaml).unwrap();
        assert_eq!(meta, again);
    }

    #[test]
    fn rejects_latest_version_alias() {
        let doc = APP_DB.replace("version: \"3\"", "version: latest");
        let err = SecretMetadata::from_yaml(&doc).unwrap_err();
        assert!(err.to_string().contains("latest"), "{err}");
    }

    #[test]
    fn rejects_duplicate_key_names() {
        let doc = APP_DB.replace("keyName: url", "keyName: password");
        let err = SecretMetadata::from_yaml(&doc).unwrap_err();
        assert!(err.to_string().contains("duplicate key name"), "{err}");
    }

    #[test]
    fn rejects_reference_to_missing_key() {
        let doc = APP_DB.replace("referenceKeyName: password", "referenceKeyName: nope");
        let err = SecretMetadata::from_yaml(&doc).unwrap_err();
        assert!(err.to_string().contains("nope"), "{err}");
    }

    #[test]
    fn rejects_gsm_key_without_ref() {
        let doc = APP_DB.replace(
            "    gsmRef: { secretResource: app-db-password, version: \"3\" }\n",
            "",
        );
        assert!(SecretMetadata::from_yaml(&doc).is_err());
    }

    #[test]
    fn rejects_unsafe_short_name() {
        assert!(validate_short_name("app-db").is_ok());
        assert!(validate_short_name("app_db.v2").is_ok());
        assert!(validate_short_name("").is_err());
        assert!(validate_short_name("../etc").is_err());
        assert!(validate_short_name(".hidden").is_err());
        assert!(validate_short_name("a b").is_err());
    }

    #[test]
    fn retired_requires_retirement_block() {
        let doc = APP_DB.replace("sealedSecret:", "status: retired\nsealedSecret:");
        assert!(SecretMetadata::from_yaml(&doc).is_err());

        let doc = APP_DB.replace(
            "sealedSecret:",
            "status: retired\nretirement:\n  retiredAt: \"2024-05-01T00:00:00Z\"\n  reason: replaced\n  replacedBy: app-db-v2\nsealedSecret:",
        );
        let meta = SecretMetadata::from_yaml(&doc).unwrap();
        assert!(meta.is_retired());
    }

    #[test]
    fn expiry_predicates() {
        let meta = SecretMetadata::from_yaml(APP_DB).unwrap();
        let url = meta.key("url").unwrap();

        let before = Utc.with_ymd_and_hms(2029, 12, 20, 0, 0, 0).unwrap();
        let after = Utc.with_ymd_and_hms(2030, 1, 2, 0, 0, 0).unwrap();

        assert!(!url.is_expired_at(before));
        assert!(url.is_expired_at(after));
        assert!(url.expires_within_days_at(30, before));
        assert!(!url.expires_within_days_at(5, before));
        assert_eq!(meta.expiring_keys_at(30, before).len(), 1);

        // Keys without expiry never expire.
        assert!(!meta.key("password").unwrap().is_expired_at(after));
    }

    #[test]
    fn rotation_mode_names_match_documents() {
        for mode in [
            RotationMode::Static,
            RotationMode::Generated,
            RotationMode::External,
            RotationMode::Unknown,
        ] {
            let yaml = serde_yaml::to_string(&mode).unwrap();
            assert_eq!(yaml.trim(), mode.as_str());
            assert_eq!(mode.to_string(), mode.as_str());
        }
    }

    #[test]
    fn huge_expiry_windows_saturate() {
        let meta = SecretMetadata::from_yaml(APP_DB).unwrap();
        let url = meta.key("url").unwrap();
        let before = Utc.with_ymd_and_hms(2029, 12, 20, 0, 0, 0).unwrap();

        assert!(url.expires_within_days_at(1_000_000_000_000, before));
        assert!(url.expires_within_days_at(i64::MAX, before));
        assert!(!url.expires_within_days_at(i64::MIN, before));
        assert!(!meta.key("password").unwrap().expires_within_days_at(i64::MAX, before));
        assert_eq!(meta.expiring_keys_at(1_000_000_000_000, before).len(), 1);
    }

    #[test]
    fn cross_secret_references_are_not_local() {
        let doc = APP_DB.replace(
            "{ variableName: pass, referenceKeyName: password }",
            "{ variableName: pass, referenceKeyName: root, referenceShortName: shared-db }",
        );
        let meta = SecretMetadata::from_yaml(&doc).unwrap();
        assert_eq!(meta.external_references(), vec!["shared-db"]);
    }
}
