//! Evaluation order for a secret's keys.
//!
//! Edges run from a computed key to every key it references within the
//! same secret. The order is a Kahn topological sort that always emits
//! the earliest-declared ready key next, so the result is deterministic
//! and equals declaration order whenever declaration order is already
//! valid. Inputs pointing into other secrets are not edges here; the
//! engine resolves those secrets separately.

use std::collections::{BTreeSet, HashMap};

use crate::errors::{Result, SealVaultError};
use crate::metadata::{KeyMetadata, SecretMetadata};

/// Order `metadata.keys` so every computed key follows all keys it reads.
///
/// Fails with `UnknownReference` for an input naming a key that does not
/// exist in the secret, and with `CyclicDependency` (listing the keys on
/// the cycle) when no such order exists.
pub fn evaluation_order(metadata: &SecretMetadata) -> Result<Vec<&KeyMetadata>> {
    order_keys(metadata, None)
}

/// Like [`evaluation_order`], restricted to `requested` and the keys they
/// read, directly or transitively.
///
/// Requested names the secret does not declare are ignored; the caller
/// reports them against the key that asked. Keys outside the closure are
/// never checked, so a broken key elsewhere in the secret does not fail
/// the request.
pub fn evaluation_order_for<'m>(
    metadata: &'m SecretMetadata,
    requested: &BTreeSet<String>,
) -> Result<Vec<&'m KeyMetadata>> {
    order_keys(metadata, Some(requested))
}

fn order_keys<'m>(
    metadata: &'m SecretMetadata,
    requested: Option<&BTreeSet<String>>,
) -> Result<Vec<&'m KeyMetadata>> {
    let keys = &metadata.keys;
    let index: HashMap<&str, usize> = keys
        .iter()
        .enumerate()
        .map(|(i, k)| (k.key_name.as_str(), i))
        .collect();

    let included = match requested {
        None => vec![true; keys.len()],
        Some(names) => closure(metadata, &index, names),
    };

    // deps[i]: keys i reads; dependents[j]: keys that read j.
    let mut deps: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); keys.len()];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); keys.len()];

    for (i, key) in keys.iter().enumerate().filter(|&(i, _)| included[i]) {
        for input in key.inputs() {
            if !input.is_local(&metadata.short_name) {
                continue;
            }
            let j = *index
                .get(input.reference_key_name.as_str())
                .ok_or_else(|| SealVaultError::UnknownReference {
                    secret: metadata.short_name.clone(),
                    key: key.key_name.clone(),
                    reference: input.reference_key_name.clone(),
                })?;
            if deps[i].insert(j) {
                dependents[j].push(i);
            }
        }
    }

    let total = included.iter().filter(|&&on| on).count();
    let mut pending: Vec<usize> = deps.iter().map(BTreeSet::len).collect();
    let mut ready: BTreeSet<usize> = (0..keys.len())
        .filter(|&i| included[i] && pending[i] == 0)
        .collect();
    let mut order = Vec::with_capacity(total);

    while let Some(next) = ready.pop_first() {
        order.push(&keys[next]);
        for &dependent in &dependents[next] {
            pending[dependent] -= 1;
            if pending[dependent] == 0 {
                ready.insert(dependent);
            }
        }
    }

    if order.len() < total {
        let remaining: BTreeSet<usize> = (0..keys.len()).filter(|&i| pending[i] > 0).collect();
        return Err(SealVaultError::CyclicDependency {
            secret: metadata.short_name.clone(),
            cycle: find_cycle(&deps, &remaining)
                .into_iter()
                .map(|i| keys[i].key_name.clone())
                .collect(),
        });
    }

    Ok(order)
}

/// Mark the requested keys and every local key they read.
fn closure(
    metadata: &SecretMetadata,
    index: &HashMap<&str, usize>,
    requested: &BTreeSet<String>,
) -> Vec<bool> {
    let mut included = vec![false; metadata.keys.len()];
    let mut stack: Vec<usize> = requested
        .iter()
        .filter_map(|name| index.get(name.as_str()).copied())
        .collect();

    while let Some(i) = stack.pop() {
        if std::mem::replace(&mut included[i], true) {
            continue;
        }
        for input in metadata.keys[i].inputs() {
            if !input.is_local(&metadata.short_name) {
                continue;
            }
            if let Some(&j) = index.get(input.reference_key_name.as_str()) {
                stack.push(j);
            }
        }
    }
    included
}

/// Walk dependencies among the unsorted keys until one repeats.
///
/// Every unsorted key still waits on another unsorted key, so the walk
/// cannot dead-end. The returned path starts and ends on the same key.
fn find_cycle(deps: &[BTreeSet<usize>], remaining: &BTreeSet<usize>) -> Vec<usize> {
    let Some(&start) = remaining.first() else {
        return Vec::new();
    };

    let mut path = vec![start];
    let mut position: HashMap<usize, usize> = HashMap::from([(start, 0)]);
    let mut current = start;

    loop {
        let Some(&next) = deps[current].iter().find(|d| remaining.contains(d)) else {
            return path;
        };
        if let Some(&at) = position.get(&next) {
            let mut cycle = path.split_off(at);
            cycle.push(next);
            return cycle;
        }
        position.insert(next, path.len());
        path.push(next);
        current = next;
    }
}
