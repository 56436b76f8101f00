//! Per-secret results and batch aggregation.

use std::fmt;

use crate::errors::SealVaultError;

/// Why a secret was not processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Retired,
    Cancelled,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Retired => f.write_str("retired"),
            Self::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// Terminal state of one secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretState {
    Resealed,
    Skipped(SkipReason),
    Failed,
}

#[derive(Debug)]
pub struct SecretOutcome {
    pub short_name: String,
    pub state: SecretState,
    /// Keys sealed (or, in dry-run, keys that would be sealed).
    pub keys_resealed: usize,
    pub dry_run: bool,
    pub error: Option<SealVaultError>,
}

impl SecretOutcome {
    pub fn resealed(short_name: &str, keys: usize, dry_run: bool) -> Self {
        Self {
            short_name: short_name.to_string(),
            state: SecretState::Resealed,
            keys_resealed: keys,
            dry_run,
            error: None,
        }
    }

    pub fn skipped(short_name: &str, reason: SkipReason, dry_run: bool) -> Self {
        Self {
            short_name: short_name.to_string(),
            state: SecretState::Skipped(reason),
            keys_resealed: 0,
            dry_run,
            error: None,
        }
    }

    pub fn failed(short_name: &str, error: SealVaultError, dry_run: bool) -> Self {
        Self {
            short_name: short_name.to_string(),
            state: SecretState::Failed,
            keys_resealed: 0,
            dry_run,
            error: Some(error),
        }
    }

    /// One-line human summary, e.g. `would reseal 3 keys`.
    pub fn summary(&self) -> String {
        match self.state {
            SecretState::Resealed if self.dry_run => {
                format!("would reseal {} {}", self.keys_resealed, plural(self.keys_resealed))
            }
            SecretState::Resealed => {
                format!("resealed {} {}", self.keys_resealed, plural(self.keys_resealed))
            }
            SecretState::Skipped(reason) => format!("skipped ({reason})"),
            SecretState::Failed => match &self.error {
                Some(e) => format!("{}: {e}", e.kind()),
                None => "failed".to_string(),
            },
        }
    }
}

fn plural(n: usize) -> &'static str {
    if n == 1 {
        "key"
    } else {
        "keys"
    }
}

/// Overall result of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchStatus {
    /// No secret failed.
    AllSucceeded,
    /// Some failed, at least one was resealed.
    Partial,
    /// Something failed and nothing was resealed.
    Failed,
}

/// Outcomes of a batch, sorted by short name.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub outcomes: Vec<SecretOutcome>,
}

impl BatchReport {
    pub fn new(mut outcomes: Vec<SecretOutcome>) -> Self {
        outcomes.sort_by(|a, b| a.short_name.cmp(&b.short_name));
        Self { outcomes }
    }

    pub fn count(&self, pred: impl Fn(&SecretState) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(&o.state)).count()
    }

    pub fn resealed(&self) -> usize {
        self.count(|s| *s == SecretState::Resealed)
    }

    pub fn skipped(&self) -> usize {
        self.count(|s| matches!(s, SecretState::Skipped(_)))
    }

    pub fn failed(&self) -> usize {
        self.count(|s| *s == SecretState::Failed)
    }

    pub fn status(&self) -> BatchStatus {
        match (self.failed(), self.resealed()) {
            (0, _) => BatchStatus::AllSucceeded,
            (_, 0) => BatchStatus::Failed,
            _ => BatchStatus::Partial,
        }
    }

    pub fn get(&self, short_name: &str) -> Option<&SecretOutcome> {
        self.outcomes.iter().find(|o| o.short_name == short_name)
    }
}
