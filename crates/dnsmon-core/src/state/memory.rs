// # Memory State Store
//
// In-memory implementation of StateStore.
//
// Nothing survives a restart: the first check after startup reports every
// record as NEW. Useful for tests and dry runs.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::Error;
use crate::config::StateStoreConfig;
use crate::record::Snapshot;
use crate::traits::state_store::{StateStore, StateStoreFactory};

/// In-memory state store implementation
///
/// Clones share the same underlying map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStateStore {
    inner: Arc<RwLock<HashMap<String, Snapshot>>>,
}

impl MemoryStateStore {
    /// Create a new empty memory state store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of domains with a stored snapshot
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }

    /// Clear all stored snapshots
    pub async fn clear(&self) {
        self.inner.write().await.clear();
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn load(&self, domain: &str) -> Result<Snapshot, Error> {
        let guard = self.inner.read().await;
        Ok(guard.get(domain).cloned().unwrap_or_default())
    }

    async fn save(&self, domain: &str, snapshot: &Snapshot) -> Result<(), Error> {
        let mut guard = self.inner.write().await;
        guard.insert(domain.to_string(), snapshot.clone());
        Ok(())
    }
}

/// Factory for [`MemoryStateStore`]
#[derive(Debug, Default, Clone, Copy)]
pub struct MemoryStateStoreFactory;

impl StateStoreFactory for MemoryStateStoreFactory {
    fn create(&self, config: &StateStoreConfig) -> Result<Box<dyn StateStore>, Error> {
        match config {
            StateStoreConfig::Memory => Ok(Box::new(MemoryStateStore::new())),
            other => Err(Error::config(format!(
                "Memory state store cannot be built from '{}' configuration",
                other.type_name()
            ))),
        }
    }
}
