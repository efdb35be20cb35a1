//! In-memory backing, used for tests and throwaway demo sessions.

use std::sync::RwLock;

use rustc_hash::FxHashMap;

use super::{KeyValueStore, StorageError};

/// Process-local key-value store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<FxHashMap<String, String>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let entries = self.entries.read().map_err(|_poisoned| StorageError::Poisoned)?;

        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.write().map_err(|_poisoned| StorageError::Poisoned)?;

        entries.insert(key.to_string(), value.to_string());

        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.write().map_err(|_poisoned| StorageError::Poisoned)?;

        entries.remove(key);

        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        let entries = self.entries.read().map_err(|_poisoned| StorageError::Poisoned)?;

        let mut keys: Vec<String> = entries.keys().cloned().collect();
        keys.sort_unstable();

        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;

    #[test]
    fn keys_follow_sets_and_removes() -> TestResult {
        let store = MemoryStore::new();

        store.set("b", "1")?;
        store.set("a", "2")?;
        store.remove("b")?;
        store.set("c", "3")?;

        assert_eq!(store.keys()?, ["a", "c"]);

        Ok(())
    }
}
