//! Keep local key material out of Git.

use std::fs;
use std::path::Path;

/// Append each missing entry to `<project_dir>/.gitignore`.
///
/// Returns the entries that were added. A write failure adds nothing and
/// is not an error; the caller can still warn.
pub fn ensure_ignored(project_dir: &Path, entries: &[&str]) -> Vec<String> {
    let path = project_dir.join(".gitignore");
    let existing = fs::read_to_string(&path).unwrap_or_default();

    let missing: Vec<String> = entries
        .iter()
        .filter(|entry| !existing.lines().any(|line| line.trim() == **entry))
        .map(|entry| (*entry).to_string())
        .collect();
    if missing.is_empty() {
        return missing;
    }

    let mut contents = existing;
    if !contents.is_empty() && !contents.ends_with('\n') {
        contents.push('\n');
    }
    for entry in &missing {
        contents.push_str(entry);
        contents.push('\n');
    }

    match fs::write(&path, contents) {
        Ok(()) => missing,
        Err(_) => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn creates_gitignore_with_entries() {
        let dir = TempDir::new().unwrap();
        let added = ensure_ignored(dir.path(), &[".sealvault/"]);
        assert_eq!(added, vec![".sealvault/"]);
        let content = fs::read_to_string(dir.path().join(".gitignore")).unwrap();
        assert_eq!(content, ".sealvault/\n");
    }

    #[test]
    fn skips_entries_already_present() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(".gitignore"), "target/\n.sealvault/\n").unwrap();
        assert!(ensure_ignored(dir.path(), &[".sealvault/"]).is_empty());
    }

    #[test]
    fn appends_after_missing_trailing_newline() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(".gitignore"), "target/").unwrap();
        ensure_ignored(dir.path(), &[".sealvault/", "*.key"]);
        let content = fs::read_to_string(dir.path().join(".gitignore")).unwrap();
        assert_eq!(content, "target/\n.sealvault/\n*.key\n");
    }
}
