//! Data access errors.

use barberbook_core::{
    filter::FilterParseError, procedures::ProcedureError, snapshot::SnapshotError,
    storage::StorageError, tables::UnknownTableError,
};
use thiserror::Error;

use crate::{config::ConfigError, remote::RemoteError};

/// Errors returned by every data operation, local or hosted.
#[derive(Debug, Error)]
pub enum DataError {
    /// The persistence backing failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// A textual filter could not be parsed.
    #[error("invalid filter expression: {0}")]
    InvalidFilter(#[from] FilterParseError),

    /// The table name is not one of the known tables.
    #[error(transparent)]
    UnknownTable(#[from] UnknownTableError),

    /// A row payload was not a JSON object or list of objects.
    #[error("invalid record payload: {0}")]
    InvalidRecord(String),

    /// No procedure is registered under this name.
    #[error("procedure {0:?} is not recognized")]
    UnknownProcedure(String),

    /// Procedure parameters were rejected.
    #[error("{0}")]
    Validation(String),

    /// The hosted backend failed or answered unexpectedly.
    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// An import or export document was malformed.
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    /// Backend configuration was incomplete.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl From<ProcedureError> for DataError {
    fn from(error: ProcedureError) -> Self {
        match error {
            ProcedureError::Unknown(name) => Self::UnknownProcedure(name),
            ProcedureError::InvalidParams(source) => Self::Validation(source.to_string()),
            ProcedureError::Validation(message) => Self::Validation(message),
            ProcedureError::Storage(source) => Self::Storage(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_failures_keep_their_cause() {
        let error = DataError::from(StorageError::InvalidKey("../escape".to_string()));

        assert!(error.to_string().contains("../escape"), "got {error}");
    }

    #[test]
    fn procedure_storage_failures_keep_their_cause() {
        let error = DataError::from(ProcedureError::Storage(StorageError::InvalidKey(
            "../escape".to_string(),
        )));

        assert!(matches!(error, DataError::Storage(_)));
        assert!(error.to_string().contains("../escape"), "got {error}");
    }
}
