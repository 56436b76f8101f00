//! `sealvault store`: put values into and list the local store.

use std::io::{self, IsTerminal, Read};

use comfy_table::{ContentArrangement, Table};
use zeroize::Zeroizing;

use crate::cli::{output, Cli, Project};
use crate::errors::{Result, SealVaultError};
use crate::store::SecretStore;
use crate::template::detect;

/// Execute `store put`.
pub fn execute_put(
    cli: &Cli,
    resource: &str,
    value: Option<&str>,
    connection_string: bool,
) -> Result<()> {
    let project = Project::load(cli)?;

    // 1. Read the value: argument, piped stdin or prompt.
    let value = read_value(resource, value)?;
    if value.is_empty() {
        return Err(SealVaultError::CommandFailed("value cannot be empty".into()));
    }

    // 2. Connection strings become a payload so the password can rotate.
    let payload = if connection_string {
        let detected = detect(&value, project.settings.connection_schemes.as_slice()).ok_or_else(|| {
            SealVaultError::CommandFailed(
                "value is not a connection string with credentials for a known scheme".into(),
            )
        })?;
        output::info(&format!("Detected template: {}", detected.template));
        Zeroizing::new(detected.into_payload().to_bytes()?)
    } else {
        Zeroizing::new(value.as_bytes().to_vec())
    };

    if cli.dry_run {
        output::info(&format!("Dry run: would add a version to '{resource}'."));
        return Ok(());
    }

    // 3. Write.
    let store = project.open_store()?;
    let version = store.create_secret_version(resource, &payload)?;

    project.audit(
        "store-put",
        None,
        Some(resource),
        &format!("version {version}"),
    );
    output::success(&format!("Stored '{resource}' version {version}"));
    output::tip(&format!(
        "Reference it in metadata as gsmRef {{secretResource: {resource}, version: \"{version}\"}}."
    ));
    Ok(())
}

/// Execute `store list`.
pub fn execute_list(cli: &Cli) -> Result<()> {
    let project = Project::load(cli)?;
    let store = project.open_store()?;
    let resources = store.list_resources()?;

    if resources.is_empty() {
        output::info("The store is empty.");
        output::tip("Run `sealvault store put <resource>` to add a value.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Resource", "Latest version"]);
    for (name, latest) in resources {
        table.add_row(vec![name, latest.to_string()]);
    }
    println!("{table}");
    Ok(())
}

fn read_value(resource: &str, value: Option<&str>) -> Result<Zeroizing<String>> {
    if let Some(v) = value {
        output::warning("Value provided on command line; it may appear in shell history.");
        return Ok(Zeroizing::new(v.to_string()));
    }

    if !io::stdin().is_terminal() {
        let mut buf = Zeroizing::new(String::new());
        io::stdin().read_to_string(&mut buf)?;
        let trimmed = buf.trim_end().to_string();
        return Ok(Zeroizing::new(trimmed));
    }

    let v = dialoguer::Password::new()
        .with_prompt(format!("Enter value for {resource}"))
        .interact()
        .map_err(|e| SealVaultError::CommandFailed(format!("input prompt: {e}")))?;
    Ok(Zeroizing::new(v))
}
