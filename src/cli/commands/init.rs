//! `sealvault init`: create the local store and sealing key.

use std::fs;

use crate::cli::gitignore::ensure_ignored;
use crate::cli::{display_path, output, prompt_new_password, Cli, Project};
use crate::crypto::{fingerprint, generate_sealing_key};
use crate::errors::{Result, SealVaultError};
use crate::store::LocalStore;

/// Execute the `init` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let project = Project::load(cli)?;
    let store_path = project.store_path();
    let key_path = project.sealing_key_path();

    // 1. Refuse to clobber an existing store.
    if store_path.exists() {
        output::tip("Use `sealvault store put <resource>` to add values.");
        return Err(SealVaultError::CommandFailed(format!(
            "store already exists at {}",
            display_path(&store_path, &project.dir)
        )));
    }

    // 2. Create the store with a new password.
    let password = prompt_new_password()?;
    LocalStore::create(
        &store_path,
        password.as_bytes(),
        &project.settings.argon2_params(),
    )?;
    output::success(&format!(
        "Store created at {}",
        display_path(&store_path, &project.dir)
    ));

    // 3. Create the sealing key unless one is already in place.
    if key_path.exists() {
        output::info("Keeping the existing sealing key.");
    } else {
        let key = generate_sealing_key(&key_path)?;
        output::success(&format!(
            "Sealing key created at {} (fingerprint {})",
            display_path(&key_path, &project.dir),
            fingerprint(&key)
        ));
    }

    // 4. Metadata directory.
    let metadata_dir = project.settings.metadata_dir(&project.dir);
    fs::create_dir_all(&metadata_dir)?;

    // 5. Keep store and key out of Git.
    for entry in ensure_ignored(&project.dir, &[".sealvault/"]) {
        output::info(&format!("Added '{entry}' to .gitignore"));
    }

    project.audit("init", None, None, "store and sealing key created");

    output::tip("Run `sealvault store put <resource>` to add a value.");
    output::tip(&format!(
        "Describe secrets in {}/<short-name>.yaml, then run `sealvault reseal-all`.",
        display_path(&metadata_dir, &project.dir)
    ));

    Ok(())
}
