//! YAML configuration for embedding the pipeline outside the HTTP server.
//!
//! A single file describes the fingerprinting parameters and the
//! orchestrator knobs, e.g.:
//!
//! ```yaml
//! fingerprint:
//!   k: 5
//!   w: 4
//!   num_perm: 100
//!   bands: 20
//!
//! store_path: /data/simcheck.redb
//! deadline_secs: 60
//! parallel_scan: false
//! ```
//!
//! Every field is optional; omitted sections fall back to the wire-contract
//! defaults.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use checker::CheckerConfig;
use fingerprint::FingerprintConfig;
use store::{BackendConfig, StoreConfig};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid YAML config: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Pipeline-level configuration bundle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub fingerprint: FingerprintConfig,

    /// Redb database path; omitted means in-memory.
    #[serde(default)]
    pub store_path: Option<PathBuf>,

    /// Soft per-check deadline in seconds.
    #[serde(default = "default_deadline_secs")]
    pub deadline_secs: u64,

    /// Fan the corpus scan out over a thread pool.
    #[serde(default)]
    pub parallel_scan: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            fingerprint: FingerprintConfig::default(),
            store_path: None,
            deadline_secs: default_deadline_secs(),
            parallel_scan: false,
        }
    }
}

fn default_deadline_secs() -> u64 {
    60
}

impl PipelineConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let cfg: PipelineConfig = serde_yaml::from_str(yaml)?;
        cfg.fingerprint
            .validate()
            .map_err(|err| ConfigError::Invalid(err.to_string()))?;
        Ok(cfg)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let yaml = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&yaml)
    }

    /// Orchestrator settings derived from this bundle.
    pub fn checker_config(&self) -> CheckerConfig {
        CheckerConfig {
            num_perm: self.fingerprint.num_perm,
            bands: self.fingerprint.bands,
            deadline: Duration::from_secs(self.deadline_secs),
            parallel_scan: self.parallel_scan,
            ..CheckerConfig::default()
        }
    }

    /// Store settings derived from this bundle.
    pub fn store_config(&self) -> StoreConfig {
        let backend = match &self.store_path {
            Some(path) => BackendConfig::redb(path.clone()),
            None => BackendConfig::in_memory(),
        };
        StoreConfig::new().with_backend(backend)
    }
}
