//! File-backed metadata: one YAML document per short name.
//!
//! ```text
//! <metadata_dir>/<shortName>.yaml
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::atomic::AtomicWriter;
use crate::errors::{Result, SealVaultError};

use super::model::{validate_short_name, SecretMetadata};

/// Extension used for metadata documents.
const EXTENSION: &str = "yaml";

/// Reads and writes metadata documents in one directory.
pub struct MetadataStore {
    dir: PathBuf,
}

impl MetadataStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the document for `short_name`.
    pub fn path_for(&self, short_name: &str) -> PathBuf {
        self.dir.join(format!("{short_name}.{EXTENSION}"))
    }

    pub fn exists(&self, short_name: &str) -> bool {
        self.path_for(short_name).exists()
    }

    /// Load and validate one secret's metadata.
    pub fn load(&self, short_name: &str) -> Result<SecretMetadata> {
        validate_short_name(short_name)?;
        let path = self.path_for(short_name);
        if !path.exists() {
            return Err(SealVaultError::MetadataNotFound(short_name.to_string()));
        }

        let contents = fs::read_to_string(&path)?;
        let metadata = SecretMetadata::from_yaml(&contents).map_err(|e| {
            SealVaultError::InvalidMetadata(format!("{}: {e}", path.display()))
        })?;

        // The file name is the identity; a mismatch means two files could
        // claim the same secret.
        if metadata.short_name != short_name {
            return Err(SealVaultError::InvalidMetadata(format!(
                "{} declares shortName '{}'",
                path.display(),
                metadata.short_name
            )));
        }

        debug!(short_name, keys = metadata.keys.len(), "loaded metadata");
        Ok(metadata)
    }

    /// Every short name with a document in the directory, sorted.
    ///
    /// Only lists names; each document is parsed separately so one bad
    /// file cannot hide the others.
    pub fn list_short_names(&self) -> Result<Vec<String>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == EXTENSION) {
                if let Some(stem) = path.file_stem() {
                    let name = stem.to_string_lossy().to_string();
                    if !name.starts_with('.') {
                        names.push(name);
                    }
                }
            }
        }

        names.sort();
        Ok(names)
    }

    /// Load every document, failing on the first invalid one.
    pub fn load_all(&self) -> Result<Vec<SecretMetadata>> {
        self.list_short_names()?
            .iter()
            .map(|name| self.load(name))
            .collect()
    }

    /// Validate and persist `metadata` atomically.
    pub fn save(&self, metadata: &SecretMetadata, writer: &dyn AtomicWriter) -> Result<()> {
        metadata.validate()?;
        let yaml = metadata.to_yaml()?;
        let path = self.path_for(&metadata.short_name);
        writer
            .write(&path, yaml.as_bytes())
            .map_err(|e| match e {
                SealVaultError::ManifestWrite { path, detail } => {
                    SealVaultError::MetadataWrite { path, detail }
                }
                other => other,
            })?;
        debug!(short_name = %metadata.short_name, "saved metadata");
        Ok(())
    }
}
