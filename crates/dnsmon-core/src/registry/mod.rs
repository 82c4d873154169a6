//! Plugin-based component registry
//!
//! The registry maps configuration discriminators to factories, so the
//! daemon never hard-codes which notifier, state store or resolver it builds.
//!
//! ## Registration
//!
//! Binding crates expose a `register()` function:
//!
//! ```rust,ignore
//! // In dnsmon-notify-telegram
//! pub fn register(registry: &ComponentRegistry) {
//!     registry.register_notifier("telegram", Box::new(TelegramFactory));
//! }
//! ```
//!
//! ```rust,ignore
//! let registry = ComponentRegistry::with_builtin_state_stores();
//! dnsmon_notify_telegram::register(&registry);
//! let notifier = registry.create_notifier(&config.notifier)?;
//! ```

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use crate::config::{NotifierConfig, ResolverConfig, StateStoreConfig};
use crate::error::{Error, Result};
use crate::state::{FileStateStoreFactory, MemoryStateStoreFactory};
use crate::traits::{Notifier, RecordResolver, StateStore};
use crate::traits::{NotifierFactory, RecordResolverFactory, StateStoreFactory};

/// Registry of notifier, state store and resolver factories
///
/// ## Thread Safety
///
/// The registry uses interior mutability with RwLock, allowing concurrent
/// reads and exclusive writes.
#[derive(Default)]
pub struct ComponentRegistry {
    notifiers: RwLock<HashMap<String, Box<dyn NotifierFactory>>>,
    state_stores: RwLock<HashMap<String, Box<dyn StateStoreFactory>>>,
    resolvers: RwLock<HashMap<String, Box<dyn RecordResolverFactory>>>,
}

impl ComponentRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the `file` and `memory` state stores registered
    pub fn with_builtin_state_stores() -> Self {
        let registry = Self::new();
        registry.register_state_store("file", Box::new(FileStateStoreFactory));
        registry.register_state_store("memory", Box::new(MemoryStateStoreFactory));
        registry
    }

    /// Register a notifier factory under `name` (e.g. "pushover", "telegram")
    pub fn register_notifier(&self, name: impl Into<String>, factory: Box<dyn NotifierFactory>) {
        self.notifiers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.into(), factory);
    }

    /// Register a state store factory under `name` (e.g. "file", "memory")
    pub fn register_state_store(
        &self,
        name: impl Into<String>,
        factory: Box<dyn StateStoreFactory>,
    ) {
        self.state_stores
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.into(), factory);
    }

    /// Register a resolver factory under `name` (e.g. "udp")
    pub fn register_resolver(
        &self,
        name: impl Into<String>,
        factory: Box<dyn RecordResolverFactory>,
    ) {
        self.resolvers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.into(), factory);
    }

    /// Create the notifier selected by `config.type_name()`
    pub fn create_notifier(&self, config: &NotifierConfig) -> Result<Box<dyn Notifier>> {
        let notifier_type = config.type_name();
        let notifiers = self.notifiers.read().unwrap_or_else(PoisonError::into_inner);

        let factory = notifiers
            .get(notifier_type)
            .ok_or_else(|| Error::config(format!("Unknown notifier type: {}", notifier_type)))?;

        factory.create(config)
    }

    /// Create the state store selected by `config.type_name()`
    pub fn create_state_store(&self, config: &StateStoreConfig) -> Result<Box<dyn StateStore>> {
        let store_type = config.type_name();
        let stores = self.state_stores.read().unwrap_or_else(PoisonError::into_inner);

        let factory = stores
            .get(store_type)
            .ok_or_else(|| Error::config(format!("Unknown state store type: {}", store_type)))?;

        factory.create(config)
    }

    /// Create the resolver registered under `name`
    pub fn create_resolver(
        &self,
        name: &str,
        config: &ResolverConfig,
    ) -> Result<Box<dyn RecordResolver>> {
        let resolvers = self.resolvers.read().unwrap_or_else(PoisonError::into_inner);

        let factory = resolvers
            .get(name)
            .ok_or_else(|| Error::config(format!("Unknown resolver type: {}", name)))?;

        factory.create(config)
    }

    pub fn list_notifiers(&self) -> Vec<String> {
        let notifiers = self.notifiers.read().unwrap_or_else(PoisonError::into_inner);
        notifiers.keys().cloned().collect()
    }

    pub fn list_state_stores(&self) -> Vec<String> {
        let stores = self.state_stores.read().unwrap_or_else(PoisonError::into_inner);
        stores.keys().cloned().collect()
    }

    pub fn has_notifier(&self, name: &str) -> bool {
        let notifiers = self.notifiers.read().unwrap_or_else(PoisonError::into_inner);
        notifiers.contains_key(name)
    }

    pub fn has_state_store(&self, name: &str) -> bool {
        let stores = self.state_stores.read().unwrap_or_else(PoisonError::into_inner);
        stores.contains_key(name)
    }

    pub fn has_resolver(&self, name: &str) -> bool {
        let resolvers = self.resolvers.read().unwrap_or_else(PoisonError::into_inner);
        resolvers.contains_key(name)
    }
}
