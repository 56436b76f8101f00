//! `sealvault validate [short-name]`: check that secrets resolve and that
//! manifests agree with metadata. Never seals or writes.

use comfy_table::{ContentArrangement, Table};
use console::style;

use crate::cli::{output, Cli, Project};
use crate::engine::ValidationReport;
use crate::errors::{Result, SealVaultError};

/// Execute the `validate` command.
pub fn execute(cli: &Cli, short_name: Option<&str>) -> Result<()> {
    let project = Project::load(cli)?;

    let results = project.with_engine(true, |engine| match short_name {
        Some(name) => Ok(vec![(name.to_string(), engine.validate(name))]),
        None => engine.validate_all(),
    })?;

    if results.is_empty() {
        output::info("No secrets found.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Secret", "Status", "Detail"]);

    let mut problems = 0;
    for (name, result) in &results {
        let (status, detail) = match result {
            Ok(report) if report.retired => (style("retired").dim().to_string(), "-".to_string()),
            Ok(report) if report.is_clean() => (
                style("ok").green().to_string(),
                format!("{} keys resolve", report.keys),
            ),
            Ok(report) => {
                problems += 1;
                (style("drift").yellow().bold().to_string(), describe(report))
            }
            Err(e) => {
                problems += 1;
                (
                    style("error").red().bold().to_string(),
                    format!("{}: {e}", e.kind()),
                )
            }
        };
        table.add_row(vec![name.clone(), status, detail]);
    }
    println!("{table}");

    if problems > 0 {
        return Err(SealVaultError::CommandFailed(format!(
            "{problems} of {} secrets have problems",
            results.len()
        )));
    }
    output::success(&format!("{} secrets validated", results.len()));
    Ok(())
}

fn describe(report: &ValidationReport) -> String {
    let mut parts = Vec::new();
    if let Some(mismatch) = &report.identity_mismatch {
        parts.push(mismatch.clone());
    }
    if let Some(drift) = &report.drift {
        if !drift.missing.is_empty() {
            parts.push(format!("not in manifest: {}", drift.missing.join(", ")));
        }
        if !drift.extra.is_empty() {
            parts.push(format!("not in metadata: {}", drift.extra.join(", ")));
        }
    }
    parts.join("; ")
}
