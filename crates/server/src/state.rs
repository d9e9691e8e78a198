use crate::config::ServerConfig;
use crate::error::ServerResult;
use checker::{CheckerConfig, DefaultChecker};
use std::sync::Arc;
use store::{BackendConfig, Store, StoreConfig};

/// Shared application state
#[derive(Clone)]
pub struct ServerState {
    /// Server configuration
    pub config: Arc<ServerConfig>,

    /// Row store (shared across requests)
    pub store: Arc<Store>,

    /// Check orchestrator (shared across requests)
    pub checker: Arc<DefaultChecker>,
}

impl ServerState {
    /// Create new server state
    pub fn new(config: ServerConfig) -> ServerResult<Self> {
        let backend = match &config.store_path {
            Some(path) => BackendConfig::redb(path.clone()),
            None => BackendConfig::in_memory(),
        };
        let store = Arc::new(Store::new(StoreConfig::new().with_backend(backend))?);

        let checker = Arc::new(DefaultChecker::new(store.clone(), CheckerConfig::default()));

        Ok(Self {
            config: Arc::new(config),
            store,
            checker,
        })
    }
}

/// Server metadata for health checks
#[derive(Debug, serde::Serialize)]
pub struct ServerMetadata {
    pub version: String,
    pub uptime_seconds: u64,
}
