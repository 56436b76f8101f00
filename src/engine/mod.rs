//! The reseal engine.
//!
//! For one secret: load metadata, resolve every key in dependency order,
//! seal each value, merge the ciphertext into the manifest and write it
//! atomically. Batches run secrets one after another; a failure is
//! recorded against its secret and never stops the others.

mod outcome;
mod resolve;

pub use outcome::{BatchReport, BatchStatus, SecretOutcome, SecretState, SkipReason};
pub use resolve::ResolvedValues;

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::atomic::AtomicWriter;
use crate::errors::{Result, SealVaultError};
use crate::generator::{generate_from_spec, GeneratorKind};
use crate::manifest::{Drift, SealedSecretManifest};
use crate::metadata::{
    GeneratorSpec, GsmVersion, KeyMetadata, KeySource, MetadataStore, RotationMode,
    SecretMetadata,
};
use crate::resolver::evaluation_order;
use crate::seal::Sealer;
use crate::store::SecretStore;
use crate::template::Payload;

/// Behaviour switches, passed in explicitly.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Resolve and validate, but seal and write nothing.
    pub dry_run: bool,
    /// Directory manifest paths in metadata are relative to.
    pub manifest_root: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            dry_run: false,
            manifest_root: PathBuf::from("."),
        }
    }
}

/// Cooperative cancellation for batches.
///
/// Once cancelled, no new secret is started; the one in flight finishes
/// (its manifest write is atomic either way).
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Result of rotating one key.
#[derive(Debug)]
pub struct RotationOutcome {
    pub short_name: String,
    pub key_name: String,
    /// The version written; `None` in dry-run.
    pub new_version: Option<GsmVersion>,
    pub reseal: SecretOutcome,
}

/// What `validate` found for one secret.
#[derive(Debug)]
pub struct ValidationReport {
    pub short_name: String,
    pub retired: bool,
    /// Keys that resolved.
    pub keys: usize,
    /// `None` when no manifest exists yet.
    pub drift: Option<Drift>,
    pub identity_mismatch: Option<String>,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.identity_mismatch.is_none() && self.drift.as_ref().map_or(true, Drift::is_clean)
    }
}

pub struct ResealEngine<'a> {
    store: &'a dyn SecretStore,
    sealer: &'a dyn Sealer,
    metadata: &'a MetadataStore,
    writer: &'a dyn AtomicWriter,
    config: EngineConfig,
    cancel: CancelToken,
}

impl<'a> ResealEngine<'a> {
    pub fn new(
        store: &'a dyn SecretStore,
        sealer: &'a dyn Sealer,
        metadata: &'a MetadataStore,
        writer: &'a dyn AtomicWriter,
        config: EngineConfig,
    ) -> Self {
        Self {
            store,
            sealer,
            metadata,
            writer,
            config,
            cancel: CancelToken::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Where the manifest for `secret` lives.
    pub fn manifest_path(&self, secret: &SecretMetadata) -> PathBuf {
        self.config.manifest_root.join(&secret.manifest_path)
    }

    // ------------------------------------------------------------------
    // Reseal
    // ------------------------------------------------------------------

    /// Reseal one secret. Failures come back as `Reseal { short_name, .. }`.
    pub fn reseal(&self, short_name: &str) -> Result<SecretOutcome> {
        let wrap = |source: SealVaultError| SealVaultError::Reseal {
            short_name: short_name.to_string(),
            source: Box::new(source),
        };

        let secret = self.metadata.load(short_name).map_err(wrap)?;
        if secret.is_retired() {
            info!(short_name, "skipping retired secret");
            return Ok(SecretOutcome::skipped(
                short_name,
                SkipReason::Retired,
                self.config.dry_run,
            ));
        }

        let keys = self.reseal_secret(&secret).map_err(wrap)?;
        Ok(SecretOutcome::resealed(short_name, keys, self.config.dry_run))
    }

    /// Reseal every secret in the metadata directory.
    ///
    /// Only a failure to list the metadata directory is returned as an
    /// error; everything after that lands in the report.
    pub fn reseal_all(&self) -> Result<BatchReport> {
        let names = self.metadata.list_short_names()?;
        let dry_run = self.config.dry_run;
        let mut outcomes = Vec::with_capacity(names.len());

        for name in &names {
            if self.cancel.is_cancelled() {
                outcomes.push(SecretOutcome::skipped(name, SkipReason::Cancelled, dry_run));
                continue;
            }

            let outcome = match self.metadata.load(name) {
                Err(e) => SecretOutcome::failed(name, e, dry_run),
                Ok(secret) if secret.is_retired() => {
                    SecretOutcome::skipped(name, SkipReason::Retired, dry_run)
                }
                Ok(secret) => match self.reseal_secret(&secret) {
                    Ok(keys) => SecretOutcome::resealed(name, keys, dry_run),
                    Err(e) => SecretOutcome::failed(name, e, dry_run),
                },
            };

            if let Some(e) = &outcome.error {
                warn!(short_name = %name, kind = %e.kind(), "secret failed: {e}");
            }
            outcomes.push(outcome);
        }

        let report = BatchReport::new(outcomes);
        info!(
            resealed = report.resealed(),
            skipped = report.skipped(),
            failed = report.failed(),
            dry_run,
            "batch finished"
        );
        Ok(report)
    }

    /// Resolve, seal, merge and write one active secret. Returns the
    /// number of keys sealed (or that would be, in dry-run).
    fn reseal_secret(&self, secret: &SecretMetadata) -> Result<usize> {
        let values = self.resolve(secret)?;
        let order = evaluation_order(secret)?;

        let path = self.manifest_path(secret);
        let mut manifest = SealedSecretManifest::load_or_new(&path, secret)?;

        if self.config.dry_run {
            info!(
                short_name = %secret.short_name,
                keys = order.len(),
                "dry run: would reseal"
            );
            return Ok(order.len());
        }

        let sealed_ref = &secret.sealed_secret;
        let mut entries = Vec::with_capacity(order.len());
        for key in &order {
            let plaintext = values.get(&key.key_name).ok_or_else(|| {
                SealVaultError::UnknownReference {
                    secret: secret.short_name.clone(),
                    key: key.key_name.clone(),
                    reference: key.key_name.clone(),
                }
            })?;
            let ciphertext = self.sealer.seal(
                &sealed_ref.name,
                &sealed_ref.namespace,
                &key.key_name,
                plaintext,
                sealed_ref.scope,
            )?;
            entries.push((key.key_name.clone(), ciphertext));
        }

        let merged = manifest.merge_encrypted(entries);
        manifest.save(&path, self.writer)?;

        info!(
            short_name = %secret.short_name,
            keys = merged,
            manifest = %path.display(),
            "resealed secret"
        );
        Ok(merged)
    }

    // ------------------------------------------------------------------
    // Rotate
    // ------------------------------------------------------------------

    /// Generate a new value for one key, store it as a new version, record
    /// the version in metadata and reseal the secret.
    pub fn rotate(&self, short_name: &str, key_name: &str) -> Result<RotationOutcome> {
        let mut secret = self.metadata.load(short_name)?;
        let not_supported = |reason: &str| SealVaultError::RotationNotSupported {
            secret: short_name.to_string(),
            key: key_name.to_string(),
            reason: reason.to_string(),
        };

        if secret.is_retired() {
            return Err(not_supported("secret is retired"));
        }
        let key = secret
            .key(key_name)
            .ok_or_else(|| not_supported("no such key"))?;
        let spec = rotation_generator(key).map_err(|reason| not_supported(&reason))?;
        let kind: GeneratorKind = spec.kind.parse()?;
        let gsm = key
            .store_ref()
            .cloned()
            .ok_or_else(|| not_supported("computed key has no store-held payload"))?;

        if self.config.dry_run {
            let reseal = self.reseal(short_name)?;
            info!(short_name, key_name, generator = %kind, "dry run: would rotate");
            return Ok(RotationOutcome {
                short_name: short_name.to_string(),
                key_name: key_name.to_string(),
                new_version: None,
                reseal,
            });
        }

        let generated = generate_from_spec(&spec)?;
        let new_payload = match &key.source {
            KeySource::Gsm(_) => generated,
            KeySource::Computed(_) => {
                let current = self.store.access_version(&gsm.secret_resource, &gsm.version)?;
                let mut payload = Payload::parse(&current)?;
                let secret_text = std::str::from_utf8(&generated).map_err(|_| {
                    SealVaultError::InvalidPayloadFormat(format!(
                        "generator '{kind}' output is not text and cannot replace a payload secret"
                    ))
                })?;
                payload.update_secret(secret_text)?;
                Zeroizing::new(payload.to_bytes()?)
            }
        };

        let version = self.store.add_version(&gsm.secret_resource, &new_payload)?;
        debug!(resource = %gsm.secret_resource, version = %version, "stored rotated value");

        if let Some(store_ref) = secret.key_mut(key_name).and_then(KeyMetadata::store_ref_mut) {
            store_ref.version = version.clone();
        }
        self.metadata.save(&secret, self.writer)?;
        info!(short_name, key_name, version = %version, "rotated key");

        let reseal = self.reseal(short_name)?;
        Ok(RotationOutcome {
            short_name: short_name.to_string(),
            key_name: key_name.to_string(),
            new_version: Some(version),
            reseal,
        })
    }

    // ------------------------------------------------------------------
    // Validate
    // ------------------------------------------------------------------

    /// Check that a secret resolves and compare its manifest with metadata.
    pub fn validate(&self, short_name: &str) -> Result<ValidationReport> {
        let secret = self.metadata.load(short_name)?;
        if secret.is_retired() {
            return Ok(ValidationReport {
                short_name: short_name.to_string(),
                retired: true,
                keys: 0,
                drift: None,
                identity_mismatch: None,
            });
        }

        let values = self.resolve(&secret)?;
        let path = self.manifest_path(&secret);
        let manifest = if path.exists() {
            Some(SealedSecretManifest::load(&path)?)
        } else {
            None
        };

        Ok(ValidationReport {
            short_name: short_name.to_string(),
            retired: false,
            keys: values.len(),
            drift: manifest.as_ref().map(|m| m.drift(&secret)),
            identity_mismatch: manifest.as_ref().and_then(|m| m.identity_mismatch(&secret)),
        })
    }

    /// `validate` for every secret, sorted by short name.
    pub fn validate_all(&self) -> Result<Vec<(String, Result<ValidationReport>)>> {
        Ok(self
            .metadata
            .list_short_names()?
            .into_iter()
            .map(|name| {
                let report = self.validate(&name);
                (name, report)
            })
            .collect())
    }

    /// Manifest on disk for `secret`, if present.
    pub fn load_manifest(&self, secret: &SecretMetadata) -> Result<Option<SealedSecretManifest>> {
        let path = self.manifest_path(secret);
        if path.exists() {
            SealedSecretManifest::load(&path).map(Some)
        } else {
            Ok(None)
        }
    }
}

/// The generator spec of a rotatable key, or why it is not rotatable.
fn rotation_generator(key: &KeyMetadata) -> std::result::Result<GeneratorSpec, String> {
    match (key.rotation.mode, &key.rotation.generator) {
        (RotationMode::Generated, Some(spec)) => Ok(spec.clone()),
        (RotationMode::Generated, None) => {
            Err("rotation mode is generated but no generator is set".into())
        }
        (mode, _) => Err(format!("rotation mode is {mode}")),
    }
}
