use std::sync::Arc;

use barberbook_app::{Database, config::DatabaseConfig, migrate};
use barberbook_core::store::RecordStore;
use clap::{Args, ValueEnum};

use super::emit;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Direction {
    /// Push the local store to the hosted backend
    LocalToRemote,
    /// Pull the hosted backend into the local store
    RemoteToLocal,
}

#[derive(Debug, Args)]
pub(crate) struct MigrateArgs {
    #[arg(value_enum)]
    direction: Direction,
}

pub(crate) async fn run(config: &DatabaseConfig, args: MigrateArgs) -> Result<(), String> {
    let persistence = config
        .persistence()
        .map_err(|error| format!("failed to open local storage: {error}"))?;

    let store = RecordStore::open(persistence.clone())
        .map_err(|error| format!("failed to open local store: {error}"))?;

    let local = Database::local(Arc::new(store));

    let remote = config
        .remote()
        .map_err(|error| format!("hosted backend is not configured: {error}"))?;

    let remote = Database::remote(remote, persistence);

    let (source, target) = match args.direction {
        Direction::LocalToRemote => (&local, &remote),
        Direction::RemoteToLocal => (&remote, &local),
    };

    let written = migrate(source, target)
        .await
        .map_err(|error| format!("migration failed: {error}"))?;

    emit(&format!("migrated {written} rows"));

    Ok(())
}
