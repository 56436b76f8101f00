//! The resolve pass: plaintext for every key, in dependency order.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use tracing::debug;
use zeroize::{Zeroize, Zeroizing};

use crate::errors::{Result, SealVaultError};
use crate::metadata::{ComputedSpec, GsmRef, KeyMetadata, KeySource, SecretMetadata};
use crate::resolver::{evaluation_order, evaluation_order_for};
use crate::template::{substitute, Payload};

use super::ResealEngine;

/// Plaintext per key for one secret's pass. Never logged: `Debug` shows
/// key names only, and every value is wiped on drop.
#[derive(Clone, Default)]
pub struct ResolvedValues {
    values: BTreeMap<String, Zeroizing<Vec<u8>>>,
}

impl fmt::Debug for ResolvedValues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedValues")
            .field("keys", &self.values.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ResolvedValues {
    pub fn insert(&mut self, key_name: &str, value: Zeroizing<Vec<u8>>) {
        self.values.insert(key_name.to_string(), value);
    }

    pub fn get(&self, key_name: &str) -> Option<&[u8]> {
        self.values.get(key_name).map(|v| v.as_slice())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn key_names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    fn extend(&mut self, other: ResolvedValues) {
        self.values.extend(other.values);
    }

    /// A value as text, for use as a template variable.
    fn text(&self, key_name: &str) -> Option<Result<String>> {
        self.get(key_name).map(|bytes| {
            String::from_utf8(bytes.to_vec()).map_err(|e| {
                let mut raw = e.into_bytes();
                raw.zeroize();
                SealVaultError::InvalidPayloadFormat(format!(
                    "value of '{key_name}' is not valid UTF-8 and cannot fill a template"
                ))
            })
        })
    }
}

/// Resolved values of secrets already visited in this pass, by short name.
pub(crate) type ResolvedCache = BTreeMap<String, ResolvedValues>;

/// Key names each other secret must supply to the keys in `order`.
fn external_requests<'m>(
    secret: &'m SecretMetadata,
    order: &[&'m KeyMetadata],
) -> BTreeMap<&'m str, BTreeSet<String>> {
    let mut requests: BTreeMap<&str, BTreeSet<String>> = BTreeMap::new();
    for input in order.iter().flat_map(|&key| key.inputs()) {
        if !input.is_local(&secret.short_name) {
            requests
                .entry(input.target_secret(&secret.short_name))
                .or_default()
                .insert(input.reference_key_name.clone());
        }
    }
    requests
}

impl<'a> ResealEngine<'a> {
    /// Resolve every key of `secret`, following references into other
    /// secrets as needed.
    pub fn resolve(&self, secret: &SecretMetadata) -> Result<ResolvedValues> {
        let mut chain = vec![secret.short_name.clone()];
        let mut cache = ResolvedCache::new();
        self.resolve_with(secret, None, &mut chain, &mut cache)
    }

    /// Resolve `requested` keys of `secret` (all of them when `None`).
    ///
    /// `chain` is the stack of secrets currently being resolved; meeting
    /// one of them again is a cross-secret cycle. Only the keys another
    /// secret actually names are read from it, and a retired secret is
    /// never read at all.
    pub(crate) fn resolve_with(
        &self,
        secret: &SecretMetadata,
        requested: Option<&BTreeSet<String>>,
        chain: &mut Vec<String>,
        cache: &mut ResolvedCache,
    ) -> Result<ResolvedValues> {
        let order = match requested {
            None => evaluation_order(secret)?,
            Some(names) => evaluation_order_for(secret, names)?,
        };

        for (target, wanted) in external_requests(secret, &order) {
            let missing: BTreeSet<String> = match cache.get(target) {
                Some(done) => wanted
                    .into_iter()
                    .filter(|k| done.get(k).is_none())
                    .collect(),
                None => wanted,
            };
            if missing.is_empty() {
                continue;
            }
            if let Some(pos) = chain.iter().position(|s| s == target) {
                let mut cycle = chain[pos..].to_vec();
                cycle.push(target.to_string());
                return Err(SealVaultError::CyclicDependency {
                    secret: secret.short_name.clone(),
                    cycle,
                });
            }

            let other = self.metadata.load(target)?;
            if other.is_retired() {
                return Err(SealVaultError::InvalidMetadata(format!(
                    "'{}' references retired secret '{target}'",
                    secret.short_name
                )));
            }
            chain.push(target.to_string());
            let values = self.resolve_with(&other, Some(&missing), chain, cache);
            chain.pop();
            cache.entry(target.to_string()).or_default().extend(values?);
        }

        let mut values = ResolvedValues::default();
        for key in order {
            let value = self.resolve_key(secret, key, &values, cache)?;
            debug!(
                short_name = %secret.short_name,
                key_name = %key.key_name,
                "resolved key"
            );
            values.insert(&key.key_name, value);
        }
        Ok(values)
    }

    fn resolve_key(
        &self,
        secret: &SecretMetadata,
        key: &KeyMetadata,
        resolved: &ResolvedValues,
        cache: &ResolvedCache,
    ) -> Result<Zeroizing<Vec<u8>>> {
        match &key.source {
            KeySource::Gsm(gsm) => self.fetch(gsm),
            KeySource::Computed(ComputedSpec {
                gsm_ref: Some(gsm), ..
            }) => {
                let bytes = self.fetch(gsm)?;
                let payload = Payload::parse(&bytes)?;
                Ok(Zeroizing::new(payload.recompute()?.into_bytes()))
            }
            KeySource::Computed(spec) => {
                let mut vars = spec.params.clone();
                let bound = self.bind_inputs(secret, key, spec, resolved, cache, &mut vars);
                let result = bound.and_then(|()| substitute(&spec.template, &vars));
                for value in vars.values_mut() {
                    value.zeroize();
                }
                Ok(Zeroizing::new(result?.into_bytes()))
            }
        }
    }

    fn fetch(&self, gsm: &GsmRef) -> Result<Zeroizing<Vec<u8>>> {
        debug!(
            resource = %gsm.secret_resource,
            version = %gsm.version,
            "reading store version"
        );
        self.store.access_version(&gsm.secret_resource, &gsm.version)
    }

    /// Bind each input's variable to its referenced value. Inputs
    /// override params of the same name.
    fn bind_inputs(
        &self,
        secret: &SecretMetadata,
        key: &KeyMetadata,
        spec: &ComputedSpec,
        resolved: &ResolvedValues,
        cache: &ResolvedCache,
        vars: &mut BTreeMap<String, String>,
    ) -> Result<()> {
        for input in &spec.inputs {
            let target = input.target_secret(&secret.short_name);
            let source = if input.is_local(&secret.short_name) {
                Some(resolved)
            } else {
                cache.get(target)
            };

            let value = source
                .and_then(|values| values.text(&input.reference_key_name))
                .ok_or_else(|| SealVaultError::UnknownReference {
                    secret: secret.short_name.clone(),
                    key: key.key_name.clone(),
                    reference: if input.is_local(&secret.short_name) {
                        input.reference_key_name.clone()
                    } else {
                        format!("{target}/{}", input.reference_key_name)
                    },
                })??;

            if let Some(mut old) = vars.insert(input.variable_name.clone(), value) {
                old.zeroize();
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_lists_key_names_only() {
        let mut values = ResolvedValues::default();
        values.insert("password", Zeroizing::new(b"hunter2".to_vec()));
        let shown = format!("{values:?}");
        assert!(shown.contains("password"));
        assert!(!shown.contains("hunter2"));
        assert_eq!(values.len(), 1);
    }

    #[test]
    fn non_utf8_value_cannot_fill_template() {
        let mut values = ResolvedValues::default();
        values.insert("raw", Zeroizing::new(vec![0xff, 0xfe]));
        assert!(matches!(
            values.text("raw"),
            Some(Err(SealVaultError::InvalidPayloadFormat(_)))
        ));
        assert!(values.text("absent").is_none());
    }
}
