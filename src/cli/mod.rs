//! CLI module: Clap argument parser, project context, output helpers and
//! command implementations.

pub mod commands;
pub mod gitignore;
pub mod output;

use std::path::{Path, PathBuf};

use clap::Parser;
use zeroize::Zeroizing;

use crate::atomic::FsAtomicWriter;
use crate::config::Settings;
use crate::engine::{BatchStatus, EngineConfig, ResealEngine};
use crate::errors::{Result, SealVaultError};
use crate::metadata::MetadataStore;
use crate::seal::LocalSealer;
use crate::store::LocalStore;

/// Environment variable consulted before prompting for the store password.
pub const PASSWORD_ENV: &str = "SEALVAULT_PASSWORD";

/// Minimum password length for new stores.
const MIN_PASSWORD_LEN: usize = 8;

/// SealVault CLI: keep SealedSecret manifests in step with a versioned store.
#[derive(Parser)]
#[command(
    name = "sealvault",
    about = "Resolve, seal and rotate SealedSecret manifests",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Resolve and validate without sealing or writing anything
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Project directory holding .sealvault.toml (default: current dir)
    #[arg(long, global = true, default_value = ".")]
    pub project_dir: PathBuf,
}

#[derive(clap::Subcommand)]
pub enum Commands {
    /// Create the local store and sealing key
    Init,

    /// Work with the local secret store
    Store {
        #[command(subcommand)]
        action: StoreAction,
    },

    /// Reseal one secret
    Reseal {
        /// Secret short name
        short_name: String,
    },

    /// Reseal every active secret
    ResealAll,

    /// Generate a new value for a key, then reseal its secret
    Rotate {
        /// Secret short name
        short_name: String,
        /// Key within the secret
        key_name: String,
    },

    /// Check that secrets resolve and manifests match metadata
    Validate {
        /// Only this secret (default: all)
        short_name: Option<String>,
    },

    /// List keys that expire soon
    Expiring {
        /// Look-ahead window in days
        #[arg(long, default_value = "30")]
        days: i64,
    },

    /// View the audit log
    Audit {
        /// Number of entries to show
        #[arg(long, default_value = "50")]
        last: usize,
        /// Only entries since a duration ago (e.g. 7d, 24h, 30m)
        #[arg(long)]
        since: Option<String>,
    },
}

#[derive(clap::Subcommand)]
pub enum StoreAction {
    /// Add a version to a store resource (created if absent)
    Put {
        /// Store resource name
        resource: String,
        /// Value (omit to read stdin or prompt)
        value: Option<String>,
        /// Store a connection string as a rotatable payload
        #[arg(long)]
        connection_string: bool,
    },

    /// List resources and their latest versions
    List,
}

// ---------------------------------------------------------------------------
// Project context shared by commands
// ---------------------------------------------------------------------------

/// Settings plus the resolved project directory.
pub struct Project {
    pub dir: PathBuf,
    pub settings: Settings,
}

impl Project {
    pub fn load(cli: &Cli) -> Result<Self> {
        let dir = if cli.project_dir.is_absolute() {
            cli.project_dir.clone()
        } else {
            std::env::current_dir()?.join(&cli.project_dir)
        };
        let settings = Settings::load(&dir)?;
        Ok(Self { dir, settings })
    }

    pub fn metadata_store(&self) -> MetadataStore {
        MetadataStore::new(self.settings.metadata_dir(&self.dir))
    }

    pub fn engine_config(&self, dry_run: bool) -> EngineConfig {
        EngineConfig {
            dry_run,
            manifest_root: self.settings.manifest_root(&self.dir),
        }
    }

    pub fn store_path(&self) -> PathBuf {
        self.settings.store_path(&self.dir)
    }

    pub fn sealing_key_path(&self) -> PathBuf {
        self.settings.sealing_key_path(&self.dir)
    }

    /// Open the local store, asking for its password.
    pub fn open_store(&self) -> Result<LocalStore> {
        let path = self.store_path();
        if !path.exists() {
            output::tip("Run `sealvault init` to create the local store.");
            return Err(SealVaultError::StoreRead {
                resource: path.display().to_string(),
                detail: "store not found".into(),
            });
        }
        let password = prompt_password()?;
        LocalStore::open(&path, password.as_bytes())
    }

    pub fn sealer(&self) -> Result<LocalSealer> {
        LocalSealer::from_file(&self.sealing_key_path())
    }

    /// Open store, sealer and metadata, then run `f` against an engine
    /// built from them.
    pub fn with_engine<T>(
        &self,
        dry_run: bool,
        f: impl FnOnce(&ResealEngine<'_>) -> Result<T>,
    ) -> Result<T> {
        let store = self.open_store()?;
        let sealer = self.sealer()?;
        let metadata = self.metadata_store();
        let writer = FsAtomicWriter;
        let engine = ResealEngine::new(
            &store,
            &sealer,
            &metadata,
            &writer,
            self.engine_config(dry_run),
        );
        f(&engine)
    }

    /// Record an audit event if auditing is enabled. Never fails.
    pub fn audit(&self, op: &str, short_name: Option<&str>, key: Option<&str>, details: &str) {
        if !self.settings.audit {
            return;
        }
        #[cfg(feature = "audit-log")]
        crate::audit::log_event(
            &self.settings.audit_db_path(&self.dir),
            op,
            short_name,
            key,
            Some(details),
        );
        #[cfg(not(feature = "audit-log"))]
        let _ = (op, short_name, key, details);
    }
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// The store password: `SEALVAULT_PASSWORD` if set, else an interactive
/// prompt. Wiped from memory on drop.
pub fn prompt_password() -> Result<Zeroizing<String>> {
    if let Ok(pw) = std::env::var(PASSWORD_ENV) {
        if !pw.is_empty() {
            return Ok(Zeroizing::new(pw));
        }
    }

    let pw = dialoguer::Password::new()
        .with_prompt("Enter store password")
        .interact()
        .map_err(|e| SealVaultError::CommandFailed(format!("password prompt: {e}")))?;
    Ok(Zeroizing::new(pw))
}

/// A new store password, confirmed, at least `MIN_PASSWORD_LEN` long.
pub fn prompt_new_password() -> Result<Zeroizing<String>> {
    if let Ok(pw) = std::env::var(PASSWORD_ENV) {
        if !pw.is_empty() {
            check_password_length(&pw)?;
            return Ok(Zeroizing::new(pw));
        }
    }

    loop {
        let password = dialoguer::Password::new()
            .with_prompt("Choose store password")
            .with_confirmation(
                "Confirm store password",
                "Passwords do not match, try again",
            )
            .interact()
            .map_err(|e| SealVaultError::CommandFailed(format!("password prompt: {e}")))?;

        match check_password_length(&password) {
            Ok(()) => return Ok(Zeroizing::new(password)),
            Err(e) => output::warning(&e.to_string()),
        }
    }
}

fn check_password_length(password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(SealVaultError::CommandFailed(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

/// Process exit code for a batch: 0 all succeeded, 2 partial, 1 failed.
pub fn exit_code(status: BatchStatus) -> i32 {
    match status {
        BatchStatus::AllSucceeded => 0,
        BatchStatus::Partial => 2,
        BatchStatus::Failed => 1,
    }
}

/// `path` relative to `base` for display, or unchanged when outside it.
pub fn display_path(path: &Path, base: &Path) -> String {
    path.strip_prefix(base)
        .unwrap_or(path)
        .display()
        .to_string()
}
