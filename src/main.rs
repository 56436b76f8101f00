use clap::Parser;
use sealvault::cli::commands;
use sealvault::cli::{Cli, Commands, StoreAction};
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();

    // Diagnostics go to stderr; SEALVAULT_LOG=debug for more.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_env("SEALVAULT_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let result = match cli.command {
        Commands::Init => commands::init::execute(&cli).map(|()| 0),
        Commands::Store { ref action } => match action {
            StoreAction::Put {
                resource,
                value,
                connection_string,
            } => commands::store_cmd::execute_put(
                &cli,
                resource,
                value.as_deref(),
                *connection_string,
            )
            .map(|()| 0),
            StoreAction::List => commands::store_cmd::execute_list(&cli).map(|()| 0),
        },
        Commands::Reseal { ref short_name } => {
            commands::reseal::execute(&cli, short_name).map(|()| 0)
        }
        Commands::ResealAll => commands::reseal_all::execute(&cli),
        Commands::Rotate {
            ref short_name,
            ref key_name,
        } => commands::rotate::execute(&cli, short_name, key_name).map(|()| 0),
        Commands::Validate { ref short_name } => {
            commands::validate::execute(&cli, short_name.as_deref()).map(|()| 0)
        }
        Commands::Expiring { days } => commands::expiring::execute(&cli, days).map(|()| 0),
        #[cfg(feature = "audit-log")]
        Commands::Audit { last, ref since } => {
            commands::audit_cmd::execute(&cli, last, since.as_deref()).map(|()| 0)
        }
        #[cfg(not(feature = "audit-log"))]
        Commands::Audit { .. } => Err(sealvault::errors::SealVaultError::AuditError(
            "built without the audit-log feature".into(),
        )),
    };

    match result {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            sealvault::cli::output::error(&e.to_string());
            std::process::exit(1);
        }
    }
}
