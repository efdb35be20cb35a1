//! Key-Value Persistence Backing
//!
//! Each table is stored as one serialized JSON array under a namespaced key
//! (`<prefix><table>`). Writes overwrite the whole array; there is no locking,
//! so concurrent writers to the same table race and the last write wins.

use std::{fmt::Debug, io, sync::Arc};

use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;

use crate::{records::Record, tables::Table};

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

/// Default key namespace.
pub const DEFAULT_KEY_PREFIX: &str = "barberbook_";

/// A durable string-keyed, string-valued store.
pub trait KeyValueStore: Send + Sync + Debug {
    /// Read a value; `Ok(None)` when the key is absent.
    ///
    /// # Errors
    ///
    /// Returns an error when the underlying medium cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write a value, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns an error when the underlying medium cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove a key. Removing an absent key is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error when the underlying medium cannot be written.
    fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// Every stored key, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error when the underlying medium cannot be listed.
    fn keys(&self) -> Result<Vec<String>, StorageError>;
}

/// Errors raised by the persistence backing.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The medium could not be read or written.
    #[error("failed to access storage key {key}")]
    Io {
        /// Key being accessed.
        key: String,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },

    /// A value could not be encoded as JSON.
    #[error("failed to serialize value for key {key}")]
    Serialize {
        /// Key being written.
        key: String,
        /// Encoder failure.
        #[source]
        source: serde_json::Error,
    },

    /// A stored value is not the JSON it should be.
    #[error("stored value for key {key} is not valid JSON")]
    Corrupt {
        /// Key being read.
        key: String,
        /// Decoder failure.
        #[source]
        source: serde_json::Error,
    },

    /// The key cannot be mapped onto the medium.
    #[error("storage key {0} contains unsupported characters")]
    InvalidKey(String),

    /// A writer panicked while holding the lock.
    #[error("storage lock was poisoned")]
    Poisoned,
}

/// Namespaced JSON persistence over a [`KeyValueStore`].
#[derive(Debug, Clone)]
pub struct Persistence {
    backend: Arc<dyn KeyValueStore>,
    prefix: String,
}

impl Persistence {
    /// Create a persistence layer over `backend` using `prefix` for every key.
    pub fn new(backend: Arc<dyn KeyValueStore>, prefix: impl Into<String>) -> Self {
        Self {
            backend,
            prefix: prefix.into(),
        }
    }

    /// An in-memory persistence layer with the default prefix.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()), DEFAULT_KEY_PREFIX)
    }

    /// The full key a named value is stored under.
    #[must_use]
    pub fn key(&self, name: &str) -> String {
        format!("{}{name}", self.prefix)
    }

    /// Names of every value stored under this prefix, prefix stripped.
    ///
    /// # Errors
    ///
    /// Returns an error when the backend cannot be listed.
    pub fn names(&self) -> Result<Vec<String>, StorageError> {
        Ok(self
            .backend
            .keys()?
            .into_iter()
            .filter_map(|key| key.strip_prefix(&self.prefix).map(str::to_string))
            .collect())
    }

    /// Read every record of a table; an absent key reads as empty.
    ///
    /// # Errors
    ///
    /// Returns an error when the backend fails or the stored JSON is corrupt.
    pub fn read(&self, table: Table) -> Result<Vec<Record>, StorageError> {
        Ok(self.get_value(table.as_str())?.unwrap_or_default())
    }

    /// Overwrite every record of a table.
    ///
    /// # Errors
    ///
    /// Returns an error when serialization or the backend write fails.
    pub fn write(&self, table: Table, records: &[Record]) -> Result<(), StorageError> {
        self.set_value(table.as_str(), &records)
    }

    /// Overwrite several tables. Everything is serialized before the first
    /// write, so a serialization failure leaves storage untouched.
    ///
    /// # Errors
    ///
    /// Returns an error when serialization or a backend write fails.
    pub fn write_batch(&self, tables: &[(Table, Vec<Record>)]) -> Result<(), StorageError> {
        let serialized = tables
            .iter()
            .map(|(table, records)| {
                let key = self.key(table.as_str());

                serde_json::to_string(records)
                    .map(|json| (key.clone(), json))
                    .map_err(|source| StorageError::Serialize { key, source })
            })
            .collect::<Result<Vec<_>, _>>()?;

        for (key, json) in &serialized {
            self.backend.set(key, json)?;
        }

        Ok(())
    }

    /// Read and deserialize a named value.
    ///
    /// # Errors
    ///
    /// Returns an error when the backend fails or the stored JSON does not
    /// deserialize into `T`.
    pub fn get_value<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, StorageError> {
        let key = self.key(name);

        let Some(raw) = self.backend.get(&key)? else {
            return Ok(None);
        };

        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|source| StorageError::Corrupt { key, source })
    }

    /// Serialize and store a named value.
    ///
    /// # Errors
    ///
    /// Returns an error when serialization or the backend write fails.
    pub fn set_value<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> Result<(), StorageError> {
        let key = self.key(name);

        let json = serde_json::to_string(value).map_err(|source| StorageError::Serialize {
            key: key.clone(),
            source,
        })?;

        self.backend.set(&key, &json)
    }

    /// Remove a named value; idempotent.
    ///
    /// # Errors
    ///
    /// Returns an error when the backend write fails.
    pub fn remove_value(&self, name: &str) -> Result<(), StorageError> {
        self.backend.remove(&self.key(name))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use testresult::TestResult;

    use crate::records::records_from_value;

    use super::*;

    #[test]
    fn missing_table_reads_as_empty() -> TestResult {
        let persistence = Persistence::in_memory();

        assert!(persistence.read(Table::Services)?.is_empty());
        assert!(persistence.names()?.is_empty());

        Ok(())
    }

    #[test]
    fn names_only_cover_this_prefix() -> TestResult {
        let backend = Arc::new(MemoryStore::new());
        let persistence = Persistence::new(backend.clone(), "test_");

        backend.set("other_services", "[]")?;
        persistence.write(Table::Services, &[])?;
        persistence.set_value("session", &json!({}))?;

        assert_eq!(persistence.names()?, ["services", "session"]);

        Ok(())
    }

    #[test]
    fn tables_are_stored_under_prefixed_keys() -> TestResult {
        let backend = Arc::new(MemoryStore::new());
        let persistence = Persistence::new(backend.clone(), "test_");
        let records = records_from_value(json!([{ "id": "1" }])).ok_or("not records")?;

        persistence.write(Table::Services, &records)?;

        assert_eq!(backend.get("test_services")?, Some(r#"[{"id":"1"}]"#.to_string()));

        Ok(())
    }

    #[test]
    fn corrupt_json_is_reported() -> TestResult {
        let backend = Arc::new(MemoryStore::new());
        let persistence = Persistence::new(backend.clone(), "test_");

        backend.set("test_clients", "{not json")?;

        assert!(matches!(
            persistence.read(Table::Clients),
            Err(StorageError::Corrupt { .. })
        ));

        Ok(())
    }

    #[test]
    fn write_batch_writes_every_table() -> TestResult {
        let persistence = Persistence::in_memory();
        let barber = records_from_value(json!({ "id": "b" })).ok_or("not records")?;
        let service = records_from_value(json!({ "id": "s" })).ok_or("not records")?;

        persistence.write_batch(&[(Table::Barbers, barber), (Table::Services, service)])?;

        assert_eq!(persistence.read(Table::Barbers)?.len(), 1);
        assert_eq!(persistence.read(Table::Services)?.len(), 1);

        Ok(())
    }
}
