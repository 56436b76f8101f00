use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::crypto::Argon2Params;
use crate::errors::{Result, SealVaultError};
use crate::template::DEFAULT_SCHEMES;

/// Project-level configuration, loaded from `.sealvault.toml`.
///
/// Every field has a default, so a project works without any config
/// file at all. Relative paths are resolved against the project dir.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Directory holding one `<shortName>.yaml` per secret.
    #[serde(default = "default_metadata_dir")]
    pub metadata_dir: String,

    /// Directory manifest paths in metadata are relative to.
    #[serde(default = "default_manifest_root")]
    pub manifest_root: String,

    /// Encrypted local store file.
    #[serde(default = "default_store_path")]
    pub store_path: String,

    /// Key used by the local sealer.
    #[serde(default = "default_sealing_key_path")]
    pub sealing_key_path: String,

    /// Argon2 memory cost in KiB (default: 64 MB).
    #[serde(default = "default_argon2_memory_kib")]
    pub argon2_memory_kib: u32,

    #[serde(default = "default_argon2_iterations")]
    pub argon2_iterations: u32,

    #[serde(default = "default_argon2_parallelism")]
    pub argon2_parallelism: u32,

    /// URI schemes treated as connection strings by `store put`.
    #[serde(default = "default_connection_schemes")]
    pub connection_schemes: Vec<String>,

    /// Record operations in `.sealvault/audit.db`.
    #[serde(default = "default_audit")]
    pub audit: bool,
}

// ── Serde default helpers ────────────────────────────────────────────

fn default_metadata_dir() -> String {
    "secrets/metadata".to_string()
}

fn default_manifest_root() -> String {
    ".".to_string()
}

fn default_store_path() -> String {
    ".sealvault/store.svst".to_string()
}

fn default_sealing_key_path() -> String {
    ".sealvault/sealing.key".to_string()
}

fn default_argon2_memory_kib() -> u32 {
    65_536
}

fn default_argon2_iterations() -> u32 {
    3
}

fn default_argon2_parallelism() -> u32 {
    4
}

fn default_connection_schemes() -> Vec<String> {
    DEFAULT_SCHEMES.iter().map(|s| (*s).to_string()).collect()
}

fn default_audit() -> bool {
    true
}

// ── Implementation ───────────────────────────────────────────────────

impl Default for Settings {
    fn default() -> Self {
        Self {
            metadata_dir: default_metadata_dir(),
            manifest_root: default_manifest_root(),
            store_path: default_store_path(),
            sealing_key_path: default_sealing_key_path(),
            argon2_memory_kib: default_argon2_memory_kib(),
            argon2_iterations: default_argon2_iterations(),
            argon2_parallelism: default_argon2_parallelism(),
            connection_schemes: default_connection_schemes(),
            audit: default_audit(),
        }
    }
}

impl Settings {
    pub const FILE_NAME: &'static str = ".sealvault.toml";

    /// Load settings from `<project_dir>/.sealvault.toml`.
    ///
    /// A missing file gives the defaults; a malformed one is an error.
    pub fn load(project_dir: &Path) -> Result<Self> {
        let config_path = project_dir.join(Self::FILE_NAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path)?;

        let settings: Settings = toml::from_str(&contents).map_err(|e| {
            SealVaultError::ConfigError(format!("Failed to parse {}: {e}", config_path.display()))
        })?;

        settings.argon2_params().check().map_err(|e| {
            SealVaultError::ConfigError(format!("{}: {e}", config_path.display()))
        })?;

        Ok(settings)
    }

    pub fn metadata_dir(&self, project_dir: &Path) -> PathBuf {
        project_dir.join(&self.metadata_dir)
    }

    pub fn manifest_root(&self, project_dir: &Path) -> PathBuf {
        project_dir.join(&self.manifest_root)
    }

    pub fn store_path(&self, project_dir: &Path) -> PathBuf {
        project_dir.join(&self.store_path)
    }

    pub fn sealing_key_path(&self, project_dir: &Path) -> PathBuf {
        project_dir.join(&self.sealing_key_path)
    }

    /// Audit database location: `<project_dir>/.sealvault/audit.db`.
    pub fn audit_db_path(&self, project_dir: &Path) -> PathBuf {
        project_dir.join(".sealvault").join("audit.db")
    }

    /// Convert the Argon2 settings into crypto-layer params.
    pub fn argon2_params(&self) -> Argon2Params {
        Argon2Params {
            memory_kib: self.argon2_memory_kib,
            iterations: self.argon2_iterations,
            parallelism: self.argon2_parallelism,
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────
