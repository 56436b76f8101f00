//! The sealing boundary.
//!
//! Resolved plaintext leaves the engine only through a `Sealer`, which
//! turns one value into ciphertext bound to the secret's scope.

pub mod local;

pub use local::LocalSealer;

use crate::errors::Result;
use crate::metadata::SealScope;

/// Encrypts a single value for a SealedSecret manifest.
pub trait Sealer: Send + Sync {
    /// Seal `plaintext` for key `key_name` of secret `secret_name` in
    /// `namespace`. Failures surface as `SealError`.
    fn seal(
        &self,
        secret_name: &str,
        namespace: &str,
        key_name: &str,
        plaintext: &[u8],
        scope: SealScope,
    ) -> Result<String>;
}

/// The label a ciphertext is bound to under `scope`.
///
/// Strict binds name and namespace, namespace-wide binds the namespace
/// only, cluster-wide binds nothing.
pub fn scope_label(secret_name: &str, namespace: &str, scope: SealScope) -> String {
    match scope {
        SealScope::Strict => format!("{namespace}/{secret_name}"),
        SealScope::NamespaceWide => namespace.to_string(),
        SealScope::ClusterWide => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_per_scope() {
        assert_eq!(scope_label("app", "prod", SealScope::Strict), "prod/app");
        assert_eq!(scope_label("app", "prod", SealScope::NamespaceWide), "prod");
        assert_eq!(scope_label("app", "prod", SealScope::ClusterWide), "");
    }
}
