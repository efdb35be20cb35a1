use std::{fs, path::PathBuf};

use barberbook_app::Database;
use barberbook_core::snapshot::Snapshot;
use clap::Args;

use super::emit;

#[derive(Debug, Args)]
pub(crate) struct ExportArgs {
    /// Output file; stdout when omitted
    #[arg(long, short)]
    output: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub(crate) struct ImportArgs {
    /// Snapshot file produced by `export`
    input: PathBuf,
}

pub(crate) async fn export(database: &Database, args: ExportArgs) -> Result<(), String> {
    let snapshot = database
        .export()
        .await
        .map_err(|error| format!("failed to export: {error}"))?;

    let json = snapshot
        .to_json()
        .map_err(|error| format!("failed to encode snapshot: {error}"))?;

    match args.output {
        Some(path) => {
            fs::write(&path, json)
                .map_err(|error| format!("failed to write {}: {error}", path.display()))?;

            emit(&format!(
                "exported {} rows to {}",
                snapshot.row_count(),
                path.display()
            ));
        }
        None => emit(&json),
    }

    Ok(())
}

pub(crate) async fn import(database: &Database, args: ImportArgs) -> Result<(), String> {
    let json = fs::read_to_string(&args.input)
        .map_err(|error| format!("failed to read {}: {error}", args.input.display()))?;

    let snapshot =
        Snapshot::from_json(&json).map_err(|error| format!("invalid snapshot: {error}"))?;

    let written = database
        .import(&snapshot)
        .await
        .map_err(|error| format!("failed to import: {error}"))?;

    emit(&format!("imported {written} rows"));

    Ok(())
}
