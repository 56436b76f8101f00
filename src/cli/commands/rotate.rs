//! `sealvault rotate <short-name> <key>`: generate a new value, store it as
//! a new version and reseal.

use crate::cli::{output, Cli, Project};
use crate::errors::Result;

/// Execute the `rotate` command.
pub fn execute(cli: &Cli, short_name: &str, key_name: &str) -> Result<()> {
    let project = Project::load(cli)?;

    let rotation = project.with_engine(cli.dry_run, |engine| engine.rotate(short_name, key_name))?;

    match &rotation.new_version {
        Some(version) => {
            output::success(&format!(
                "Rotated {short_name}/{key_name} to version {version}"
            ));
            project.audit(
                "rotate",
                Some(short_name),
                Some(key_name),
                &format!("version {version}"),
            );
        }
        None => output::info(&format!(
            "Dry run: {short_name}/{key_name} can be rotated."
        )),
    }
    output::outcome_line(&rotation.reseal);

    Ok(())
}
