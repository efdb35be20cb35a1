//! Directory-backed store: one file per key.

use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use super::{KeyValueStore, StorageError};

/// Durable key-value store keeping each key in `<root>/<key>.json`.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Open (creating if needed) a store rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns an error when the directory cannot be created.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();

        fs::create_dir_all(&root).map_err(|source| StorageError::Io {
            key: root.display().to_string(),
            source,
        })?;

        Ok(Self { root })
    }

    /// Directory holding the key files.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');

        if !valid {
            return Err(StorageError::InvalidKey(key.to_string()));
        }

        Ok(self.root.join(format!("{key}.json")))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key)?;

        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StorageError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        let staging = path.with_extension("json.tmp");

        // Write-then-rename so readers never observe a half-written array.
        fs::write(&staging, value)
            .and_then(|()| fs::rename(&staging, &path))
            .map_err(|source| StorageError::Io {
                key: key.to_string(),
                source,
            })
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;

        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StorageError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        let listing_error = |source| StorageError::Io {
            key: self.root.display().to_string(),
            source,
        };

        let mut keys = Vec::new();

        for entry in fs::read_dir(&self.root).map_err(listing_error)? {
            let name = entry.map_err(listing_error)?.file_name();

            // Staging files end in `.json.tmp` and are skipped here.
            if let Some(key) = name.to_str().and_then(|name| name.strip_suffix(".json")) {
                keys.push(key.to_string());
            }
        }

        keys.sort_unstable();

        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;

    #[test]
    fn values_survive_reopening() -> TestResult {
        let dir = tempfile::tempdir()?;

        FileStore::open(dir.path())?.set("barberbook_services", "[]")?;

        let reopened = FileStore::open(dir.path())?;

        assert_eq!(reopened.get("barberbook_services")?, Some("[]".to_string()));

        Ok(())
    }

    #[test]
    fn missing_keys_and_double_removes_are_fine() -> TestResult {
        let dir = tempfile::tempdir()?;
        let store = FileStore::open(dir.path())?;

        assert_eq!(store.get("barberbook_session")?, None);

        store.remove("barberbook_session")?;
        store.remove("barberbook_session")?;

        Ok(())
    }

    #[test]
    fn keys_list_stored_files_only() -> TestResult {
        let dir = tempfile::tempdir()?;
        let store = FileStore::open(dir.path())?;

        store.set("barberbook_services", "[]")?;
        store.set("barberbook_barbers", "[]")?;
        std::fs::write(dir.path().join("barberbook_clients.json.tmp"), "[")?;
        std::fs::write(dir.path().join("notes.txt"), "x")?;

        assert_eq!(store.keys()?, ["barberbook_barbers", "barberbook_services"]);

        Ok(())
    }

    #[test]
    fn path_traversal_keys_are_rejected() -> TestResult {
        let dir = tempfile::tempdir()?;
        let store = FileStore::open(dir.path())?;

        assert!(matches!(
            store.set("../escape", "x"),
            Err(StorageError::InvalidKey(_))
        ));

        Ok(())
    }
}
