//! `sealvault reseal-all`: reseal every secret and report per secret.
//!
//! Exit code 0 when every secret succeeded (or was skipped), 2 on partial
//! failure, 1 when nothing succeeded.

use crate::cli::{exit_code, output, Cli, Project};
use crate::engine::SecretState;
use crate::errors::Result;

/// Execute the `reseal-all` command, returning the process exit code.
pub fn execute(cli: &Cli) -> Result<i32> {
    let project = Project::load(cli)?;

    let report = project.with_engine(cli.dry_run, |engine| engine.reseal_all())?;

    if cli.dry_run {
        output::info("Dry run: nothing was sealed or written.");
    } else {
        for outcome in &report.outcomes {
            match outcome.state {
                SecretState::Resealed => project.audit(
                    "reseal",
                    Some(&outcome.short_name),
                    None,
                    &format!("{} keys", outcome.keys_resealed),
                ),
                SecretState::Failed => project.audit(
                    "reseal-failed",
                    Some(&outcome.short_name),
                    None,
                    &outcome.summary(),
                ),
                SecretState::Skipped(_) => {}
            }
        }
    }

    output::print_batch_report(&report);
    Ok(exit_code(report.status()))
}
