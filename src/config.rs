//! Store configuration
//!
//! Backends are chosen by an explicit [`StoreConfig`] handed to
//! [`Stores::open`]. Nothing is read from disk unless the caller asks for it:
//!
//! ```yaml
//! backend:
//!   type: files
//!   root: /nrs/experiments/store
//! max_upsert_attempts: 5
//! reconcile: local_wins
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::kv::{FileKvStore, KvStore, MemoryKvStore};
use crate::store::{ConfigStore, ReconcilePolicy, StatsStore, DEFAULT_UPSERT_ATTEMPTS};
use crate::{Error, Result};

/// File name looked up by [`StoreConfig::discover`].
pub const CONFIG_FILE_NAME: &str = "runstore.yaml";

/// Backing store selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BackendConfig {
    /// Process-local, lost on exit.
    #[default]
    Memory,
    /// Directory tree shared by every process that can see `root`.
    Files {
        /// Store root directory.
        root: PathBuf,
    },
}

/// Configuration for [`Stores::open`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// Backing store.
    #[serde(default)]
    pub backend: BackendConfig,
    /// Conditional-write attempts before a config store call gives up.
    #[serde(default = "default_upsert_attempts")]
    pub max_upsert_attempts: u32,
    /// What a push does when the local series is not ahead of the store.
    #[serde(default)]
    pub reconcile: ReconcilePolicy,
}

const fn default_upsert_attempts() -> u32 {
    DEFAULT_UPSERT_ATTEMPTS
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: BackendConfig::default(),
            max_upsert_attempts: DEFAULT_UPSERT_ATTEMPTS,
            reconcile: ReconcilePolicy::default(),
        }
    }
}

impl StoreConfig {
    /// Configuration for a directory backend at `root`.
    #[must_use]
    pub fn files(root: impl Into<PathBuf>) -> Self {
        Self {
            backend: BackendConfig::Files { root: root.into() },
            ..Self::default()
        }
    }

    /// Parse a YAML document.
    ///
    /// # Errors
    ///
    /// [`Error::Yaml`] on malformed input, [`Error::Config`] on invalid values.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a YAML file.
    ///
    /// # Errors
    ///
    /// [`Error::Io`] if the file cannot be read, otherwise as
    /// [`Self::from_yaml_str`].
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let yaml = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&yaml)
    }

    /// Load `./runstore.yaml` from `cwd`, else `~/.config/runstore.yaml` from
    /// `home`, else the defaults.
    ///
    /// # Errors
    ///
    /// As [`Self::from_yaml_file`] for the first file found.
    pub fn discover(cwd: impl AsRef<Path>, home: Option<&Path>) -> Result<Self> {
        let mut candidates = vec![cwd.as_ref().join(CONFIG_FILE_NAME)];
        if let Some(home) = home {
            candidates.push(home.join(".config").join(CONFIG_FILE_NAME));
        }
        for path in candidates {
            if path.is_file() {
                debug!(path = %path.display(), "loading store config");
                return Self::from_yaml_file(&path);
            }
        }
        Ok(Self::default())
    }

    fn validate(&self) -> Result<()> {
        if self.max_upsert_attempts == 0 {
            return Err(Error::Config(
                "max_upsert_attempts must be at least 1".to_string(),
            ));
        }
        if let BackendConfig::Files { root } = &self.backend {
            if root.as_os_str().is_empty() {
                return Err(Error::Config("files backend needs a root".to_string()));
            }
        }
        Ok(())
    }
}

/// A config store and a stats store sharing one backend.
#[derive(Debug, Clone)]
pub struct Stores {
    /// Config records.
    pub configs: ConfigStore,
    /// Training stats and validation scores.
    pub stats: StatsStore,
}

impl Stores {
    /// Open the backend described by `config`.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] for invalid settings, [`Error::Io`] if a directory
    /// backend cannot be created.
    pub fn open(config: &StoreConfig) -> Result<Self> {
        config.validate()?;
        let backend: Arc<dyn KvStore> = match &config.backend {
            BackendConfig::Memory => Arc::new(MemoryKvStore::new()),
            BackendConfig::Files { root } => Arc::new(FileKvStore::open(root)?),
        };
        debug!(backend = ?config.backend, "opened stores");
        Ok(Self::with_backend(backend, config))
    }

    /// Build both stores on an existing backend.
    #[must_use]
    pub fn with_backend(backend: Arc<dyn KvStore>, config: &StoreConfig) -> Self {
        Self {
            configs: ConfigStore::new(Arc::clone(&backend))
                .with_max_upsert_attempts(config.max_upsert_attempts),
            stats: StatsStore::new(backend).with_policy(config.reconcile),
        }
    }
}
