//! `sealvault expiring --days N`: keys whose expiry falls within the window.
//! Reads metadata only.

use chrono::Utc;
use comfy_table::{ContentArrangement, Table};
use console::style;

use crate::cli::{output, Cli, Project};
use crate::errors::Result;

/// Execute the `expiring` command.
pub fn execute(cli: &Cli, days: i64) -> Result<()> {
    let project = Project::load(cli)?;
    let secrets = project.metadata_store().load_all()?;
    let now = Utc::now();

    let mut rows = Vec::new();
    for secret in secrets.iter().filter(|s| !s.is_retired()) {
        for key in secret.expiring_keys_at(days, now) {
            if let Some(expiry) = &key.expiry {
                rows.push((secret.short_name.as_str(), key, expiry.expires_at));
            }
        }
    }

    if rows.is_empty() {
        output::success(&format!("No keys expire within {days} days."));
        return Ok(());
    }

    rows.sort_by_key(|(_, _, at)| *at);

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Secret", "Key", "Expires", "Rotation"]);
    for (short_name, key, at) in &rows {
        let expires = at.format("%Y-%m-%d %H:%M").to_string();
        let expires = if *at <= now {
            style(format!("{expires} (expired)")).red().bold().to_string()
        } else {
            style(expires).yellow().to_string()
        };
        table.add_row(vec![
            short_name.to_string(),
            key.key_name.clone(),
            expires,
            key.rotation.mode.as_str().to_string(),
        ]);
    }
    println!("{table}");
    output::warning(&format!("{} keys expire within {days} days.", rows.len()));
    Ok(())
}
