//! Collaborator traits for the monitor
//!
//! The monitor talks to the outside world only through these interfaces:
//!
//! - [`RecordResolver`]: answer one DNS question
//! - [`Notifier`]: deliver an alert to the operator
//! - [`StateStore`]: persist the last known snapshot per domain

pub mod notifier;
pub mod resolver;
pub mod state_store;

pub use notifier::{Notifier, NotifierFactory};
pub use resolver::{RecordResolver, RecordResolverFactory, ResolvedRecord};
pub use state_store::{StateStore, StateStoreFactory};
