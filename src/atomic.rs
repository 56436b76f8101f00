//! Atomic file replacement.
//!
//! Every file SealVault persists (manifests, metadata, the local store)
//! goes through an `AtomicWriter`: the new contents are written to a temp
//! file in the same directory and renamed over the target, so readers
//! only ever see the old file or the complete new one.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::errors::{Result, SealVaultError};

/// Something that can replace a file's contents atomically.
pub trait AtomicWriter: Send + Sync {
    /// Replace `path` with `contents`, or leave it untouched on failure.
    fn write(&self, path: &Path, contents: &[u8]) -> Result<()>;
}

/// The real filesystem writer: temp file + fsync + rename.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsAtomicWriter;

impl AtomicWriter for FsAtomicWriter {
    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        write_atomic_with(path, contents, |tmp, dst| fs::rename(tmp, dst))
    }
}

/// Path of the temp file used while replacing `path`.
///
/// It lives in the same directory so the final rename never crosses a
/// filesystem boundary.
pub fn temp_path_for(path: &Path) -> PathBuf {
    let parent = path.parent().unwrap_or(Path::new("."));
    parent.join(format!(
        ".{}.tmp",
        path.file_name().unwrap_or_default().to_string_lossy()
    ))
}

/// Write `contents` to a temp file, then hand it to `commit` to move it
/// into place.
///
/// `commit` is the rename step; it is a parameter so callers (and tests)
/// can observe a failure between the temp write and the rename. On any
/// failure the temp file is removed and the original file is not touched.
pub fn write_atomic_with<F>(path: &Path, contents: &[u8], commit: F) -> Result<()>
where
    F: FnOnce(&Path, &Path) -> std::io::Result<()>,
{
    let write_err = |e: std::io::Error| SealVaultError::ManifestWrite {
        path: path.to_path_buf(),
        detail: e.to_string(),
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
    }

    let tmp_path = temp_path_for(path);

    let staged = File::create(&tmp_path).and_then(|mut file| {
        file.write_all(contents)?;
        file.sync_all()
    });
    if let Err(e) = staged {
        let _ = fs::remove_file(&tmp_path);
        return Err(write_err(e));
    }

    if let Err(e) = commit(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(write_err(e));
    }

    Ok(())
}
