//! `sealvault audit`: show the audit log.
//!
//! Usage:
//!   sealvault audit               # last 50 entries
//!   sealvault audit --last 20     # last 20
//!   sealvault audit --since 7d    # entries from the last 7 days

use chrono::{DateTime, Duration, Utc};
use comfy_table::{ContentArrangement, Table};
use console::style;

use crate::audit::{AuditEntry, AuditLog};
use crate::cli::{output, Cli, Project};
use crate::errors::{Result, SealVaultError};

/// Execute the `audit` command.
pub fn execute(cli: &Cli, last: usize, since: Option<&str>) -> Result<()> {
    let project = Project::load(cli)?;
    let db_path = project.settings.audit_db_path(&project.dir);

    let since = since.map(|s| parse_since(s, Utc::now())).transpose()?;

    let audit = AuditLog::open(&db_path)
        .ok_or_else(|| SealVaultError::AuditError("cannot open audit database".into()))?;
    let entries = audit.query(last, since)?;

    if entries.is_empty() {
        output::info("No audit entries found.");
        return Ok(());
    }

    print_entries(&entries);
    Ok(())
}

/// `7d`, `24h` or `30m` before `now`.
fn parse_since(input: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    let input = input.trim();
    let invalid = || {
        SealVaultError::CommandFailed(format!(
            "invalid duration '{input}': use a number followed by d, h or m (e.g. 7d)"
        ))
    };

    let split = input.len().checked_sub(1).ok_or_else(invalid)?;
    if !input.is_char_boundary(split) {
        return Err(invalid());
    }
    let (amount, unit) = input.split_at(split);
    let amount: i64 = amount.parse().map_err(|_| invalid())?;

    let window = match unit {
        "d" => Duration::try_days(amount),
        "h" => Duration::try_hours(amount),
        "m" => Duration::try_minutes(amount),
        _ => return Err(invalid()),
    };
    window
        .and_then(|window| now.checked_sub_signed(window))
        .ok_or_else(|| SealVaultError::CommandFailed(format!("duration '{input}' is out of range")))
}

fn print_entries(entries: &[AuditEntry]) {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Time", "Operation", "Secret", "Key", "Details"]);

    for entry in entries {
        table.add_row(vec![
            entry.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            colorize(&entry.operation),
            entry.short_name.clone().unwrap_or_else(|| "-".into()),
            entry.key_name.clone().unwrap_or_else(|| "-".into()),
            entry.details.clone().unwrap_or_else(|| "-".into()),
        ]);
    }

    println!("{}", style(format!("{} audit entries:", entries.len())).bold());
    println!("{table}");
}

fn colorize(op: &str) -> String {
    match op {
        "init" | "store-put" => style(op).green().to_string(),
        "reseal" => style(op).blue().to_string(),
        "rotate" => style(op).yellow().to_string(),
        "reseal-failed" => style(op).red().to_string(),
        _ => op.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn parse_since_units() {
        let now = noon();
        assert_eq!(parse_since("7d", now).unwrap(), now - Duration::days(7));
        assert_eq!(parse_since("24h", now).unwrap(), now - Duration::hours(24));
        assert_eq!(parse_since(" 30m ", now).unwrap(), now - Duration::minutes(30));
    }

    #[test]
    fn parse_since_rejects_garbage() {
        let now = noon();
        for bad in ["", "d", "abc", "7x", "7", "h1"] {
            assert!(parse_since(bad, now).is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn parse_since_rejects_out_of_range_windows() {
        let now = noon();
        for huge in ["99999999999999d", "9223372036854775807h", "9223372036854775807m"] {
            match parse_since(huge, now) {
                Err(SealVaultError::CommandFailed(msg)) => assert!(msg.contains("out of range")),
                other => panic!("expected out-of-range error for {huge}, got {other:?}"),
            }
        }
    }

    #[test]
    fn query_respects_since_window() {
        let dir = tempfile::TempDir::new().unwrap();
        let audit = AuditLog::open(&dir.path().join("audit.db")).unwrap();
        audit.log("reseal", Some("app-db"), None, Some("2 keys"));

        let recent = parse_since("1h", Utc::now()).unwrap();
        assert_eq!(audit.query(10, Some(recent)).unwrap().len(), 1);

        let future = Utc::now() + Duration::hours(1);
        assert!(audit.query(10, Some(future)).unwrap().is_empty());
    }
}
