//! Colored terminal output helpers.
//!
//! All user-facing output goes through these functions so styling is
//! consistent across commands.

use comfy_table::{ContentArrangement, Table};
use console::style;

use crate::engine::{BatchReport, BatchStatus, SecretOutcome, SecretState};

/// Print a green success message: "check_mark {msg}"
pub fn success(msg: &str) {
    println!("{} {}", style("\u{2713}").green().bold(), msg);
}

/// Print a red error message: "x_mark {msg}"
pub fn error(msg: &str) {
    eprintln!("{} {}", style("\u{2717}").red().bold(), msg);
}

/// Print a yellow warning: "warning_sign {msg}"
pub fn warning(msg: &str) {
    eprintln!("{} {}", style("\u{26a0}").yellow().bold(), msg);
}

/// Print a blue info message: "info_sign {msg}"
pub fn info(msg: &str) {
    println!("{} {}", style("\u{2139}").blue().bold(), msg);
}

/// Print a dim tip/hint: "arrow {msg}"
pub fn tip(msg: &str) {
    println!("{} {}", style("\u{2192}").dim(), style(msg).dim());
}

/// One status line for a secret.
pub fn outcome_line(outcome: &SecretOutcome) {
    let line = format!("{}: {}", outcome.short_name, outcome.summary());
    match outcome.state {
        SecretState::Resealed => success(&line),
        SecretState::Skipped(_) => info(&line),
        SecretState::Failed => error(&line),
    }
}

/// Per-secret table followed by a summary count.
pub fn print_batch_report(report: &BatchReport) {
    if report.outcomes.is_empty() {
        info("No secrets found.");
        tip("Add metadata files under the metadata directory, then run again.");
        return;
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Secret", "Status", "Keys", "Detail"]);

    for outcome in &report.outcomes {
        let status = match outcome.state {
            SecretState::Resealed => style("ok").green().to_string(),
            SecretState::Skipped(_) => style("skip").dim().to_string(),
            SecretState::Failed => style("fail").red().bold().to_string(),
        };
        table.add_row(vec![
            outcome.short_name.clone(),
            status,
            outcome.keys_resealed.to_string(),
            outcome.summary(),
        ]);
    }
    println!("{table}");

    let summary = format!(
        "{} resealed, {} skipped, {} failed",
        report.resealed(),
        report.skipped(),
        report.failed()
    );
    match report.status() {
        BatchStatus::AllSucceeded => success(&summary),
        BatchStatus::Partial => warning(&format!("partial failure: {summary}")),
        BatchStatus::Failed => error(&format!("failed: {summary}")),
    }
}
