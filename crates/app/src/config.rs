//! Configuration
//!
//! Settings are read from CLI flags with environment fallbacks; a `.env`
//! file is loaded first when present.

use std::{path::PathBuf, sync::Arc};

use barberbook_core::storage::{
    DEFAULT_KEY_PREFIX, FileStore, MemoryStore, Persistence, StorageError,
};
use clap::{ArgAction, Args};
use thiserror::Error;

use crate::remote::RemoteConfig;

/// Errors raised while turning settings into live components.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Hosted mode without a backend URL.
    #[error("BACKEND_URL is required when USE_LOCAL_DATABASE is false")]
    MissingBackendUrl,

    /// Hosted mode without a public key.
    #[error("BACKEND_ANON_KEY is required when USE_LOCAL_DATABASE is false")]
    MissingAnonKey,

    /// The local data directory is unusable.
    #[error("failed to open local data directory: {0}")]
    DataDir(#[source] StorageError),
}

/// Backend selection and storage settings.
#[derive(Debug, Clone, Args)]
pub struct DatabaseConfig {
    /// Use the in-process record store instead of the hosted backend
    #[arg(
        long,
        env = "USE_LOCAL_DATABASE",
        default_value_t = true,
        action = ArgAction::Set
    )]
    pub use_local: bool,

    /// Directory for persisted tables and the session; in-memory when unset
    #[arg(long, env = "LOCAL_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Namespace prefix for every storage key
    #[arg(long, env = "STORAGE_KEY_PREFIX", default_value = DEFAULT_KEY_PREFIX)]
    pub key_prefix: String,

    /// Hosted backend base URL
    #[arg(long, env = "BACKEND_URL")]
    pub backend_url: Option<String>,

    /// Hosted backend public API key
    #[arg(long, env = "BACKEND_ANON_KEY", hide_env_values = true)]
    pub backend_anon_key: Option<String>,
}

impl DatabaseConfig {
    /// Local settings over `data_dir`, or in memory when `None`.
    #[must_use]
    pub fn local(data_dir: Option<PathBuf>) -> Self {
        Self {
            use_local: true,
            data_dir,
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            backend_url: None,
            backend_anon_key: None,
        }
    }

    /// Persistence for tables and the session.
    ///
    /// # Errors
    ///
    /// Returns an error when the data directory cannot be created.
    pub fn persistence(&self) -> Result<Persistence, ConfigError> {
        let Some(dir) = &self.data_dir else {
            return Ok(Persistence::new(
                Arc::new(MemoryStore::new()),
                self.key_prefix.clone(),
            ));
        };

        let backend = FileStore::open(dir).map_err(ConfigError::DataDir)?;

        Ok(Persistence::new(Arc::new(backend), self.key_prefix.clone()))
    }

    /// Hosted backend settings.
    ///
    /// # Errors
    ///
    /// Returns an error when the URL or API key is missing.
    pub fn remote(&self) -> Result<RemoteConfig, ConfigError> {
        let url = self
            .backend_url
            .clone()
            .filter(|url| !url.trim().is_empty())
            .ok_or(ConfigError::MissingBackendUrl)?;

        let anon_key = self
            .backend_anon_key
            .clone()
            .ok_or(ConfigError::MissingAnonKey)?;

        Ok(RemoteConfig { url, anon_key })
    }
}

/// Log output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Compact, human-readable logs.
    Compact,

    /// Structured JSON logs.
    Json,
}

/// Logging settings.
#[derive(Debug, Clone, Args)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "RUST_LOG", default_value = "warn", global = true)]
    pub log_level: String,

    /// Log format (compact, json)
    #[arg(
        long,
        env = "LOG_FORMAT",
        value_enum,
        default_value_t = LogFormat::Compact,
        global = true
    )]
    pub log_format: LogFormat,
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;

    #[test]
    fn hosted_backend_requires_url_and_key() {
        let mut config = DatabaseConfig::local(None);
        config.use_local = false;

        assert!(matches!(config.remote(), Err(ConfigError::MissingBackendUrl)));

        config.backend_url = Some("https://backend.example.com".to_string());

        assert!(matches!(config.remote(), Err(ConfigError::MissingAnonKey)));
    }

    #[test]
    fn data_dir_selects_file_persistence() -> TestResult {
        let dir = tempfile::tempdir()?;
        let config = DatabaseConfig::local(Some(dir.path().join("data")));

        config.persistence()?.set_value("marker", &1)?;

        assert!(dir.path().join("data").join("barberbook_marker.json").exists());

        Ok(())
    }
}
