//! Snapshots
//!
//! A snapshot is a single JSON document holding every row of every table,
//! used to move data between stores.

use std::collections::BTreeMap;

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{records::Record, tables::Table};

/// Current snapshot document version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Errors raised while reading a snapshot.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// A table name outside the known set.
    #[error("snapshot contains unknown table {0:?}")]
    UnknownTable(String),

    /// A document written by a newer format.
    #[error("unsupported snapshot version {0}")]
    UnsupportedVersion(u32),

    /// Not a snapshot JSON document.
    #[error("invalid snapshot document: {0}")]
    Json(#[from] serde_json::Error),
}

/// Export document: table name to rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Document format version.
    pub version: u32,

    /// When the snapshot was taken.
    pub exported_at: Timestamp,

    /// Rows keyed by table name.
    pub tables: BTreeMap<String, Vec<Record>>,
}

impl Snapshot {
    /// An empty snapshot stamped with `exported_at`.
    #[must_use]
    pub fn new(exported_at: Timestamp) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            exported_at,
            tables: BTreeMap::new(),
        }
    }

    /// Add or replace the rows of `table`.
    pub fn insert_table(&mut self, table: Table, rows: Vec<Record>) {
        self.tables.insert(table.as_str().to_string(), rows);
    }

    /// Rows per known table. Fails on the first unknown table name or an
    /// unsupported version, before the caller writes anything.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::UnknownTable`] or
    /// [`SnapshotError::UnsupportedVersion`].
    pub fn tables(&self) -> Result<Vec<(Table, &[Record])>, SnapshotError> {
        if self.version != SNAPSHOT_VERSION {
            return Err(SnapshotError::UnsupportedVersion(self.version));
        }

        self.tables
            .iter()
            .map(|(name, rows)| {
                name.parse::<Table>()
                    .map(|table| (table, rows.as_slice()))
                    .map_err(|error| SnapshotError::UnknownTable(error.0))
            })
            .collect()
    }

    /// Total number of rows across all tables.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.tables.values().map(Vec::len).sum()
    }

    /// Parse a snapshot document.
    ///
    /// # Errors
    ///
    /// Returns an error when `json` is not a snapshot document.
    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Pretty-printed snapshot document.
    ///
    /// # Errors
    ///
    /// Returns an error when a row cannot be serialized.
    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
