//! `sealvault reseal <short-name>`: resolve and seal one secret.

use crate::cli::{output, Cli, Project};
use crate::engine::SecretState;
use crate::errors::Result;

/// Execute the `reseal` command.
pub fn execute(cli: &Cli, short_name: &str) -> Result<()> {
    let project = Project::load(cli)?;

    let result = project.with_engine(cli.dry_run, |engine| engine.reseal(short_name));

    match &result {
        Ok(outcome) => {
            output::outcome_line(outcome);
            if !cli.dry_run && outcome.state == SecretState::Resealed {
                project.audit(
                    "reseal",
                    Some(short_name),
                    None,
                    &format!("{} keys", outcome.keys_resealed),
                );
            }
        }
        Err(e) if !cli.dry_run => {
            project.audit("reseal-failed", Some(short_name), None, &e.to_string());
        }
        Err(_) => {}
    }

    result.map(|_| ())
}
