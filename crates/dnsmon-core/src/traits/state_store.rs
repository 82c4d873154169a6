// # State Store Trait
//
// Defines the interface for persisting the last known snapshot.
//
// One document is kept per monitored domain. The monitor loads it once at
// startup and overwrites it whenever a check finds changes.
//
// ## Implementations
//
// - File-based: one JSON document per domain (`FileStateStore`)
// - In-memory: for tests and dry runs (`MemoryStateStore`)

use async_trait::async_trait;

use crate::config::StateStoreConfig;
use crate::record::Snapshot;

/// Trait for state store implementations
///
/// # Trust Level: Trusted (Core Component)
///
/// State stores may perform I/O against their own storage only. They never
/// decide when to save; that belongs to the monitor.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Load the snapshot stored for `domain`
    ///
    /// # Returns
    ///
    /// - `Ok(Snapshot)`: the stored snapshot, or an empty one when nothing is stored
    /// - `Err(Error)`: the stored document exists but cannot be read or parsed
    async fn load(&self, domain: &str) -> Result<Snapshot, crate::Error>;

    /// Replace the snapshot stored for `domain`
    async fn save(&self, domain: &str, snapshot: &Snapshot) -> Result<(), crate::Error>;
}

/// Helper trait for constructing state stores from configuration
pub trait StateStoreFactory: Send + Sync {
    fn create(&self, config: &StateStoreConfig) -> Result<Box<dyn StateStore>, crate::Error>;
}
