//! Application state shared across handlers

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::services::oracle_service::OracleRegistry;

/// Shared application state
#[derive(Clone, Default)]
pub struct AppState {
    registry: Arc<RwLock<Arc<OracleRegistry>>>,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the bootstrapped registry visible to handlers. Until then they
    /// see an empty registry.
    pub async fn publish_registry(&self, registry: Arc<OracleRegistry>) {
        *self.registry.write().await = registry;
    }

    pub async fn registry(&self) -> Arc<OracleRegistry> {
        self.registry.read().await.clone()
    }
}
