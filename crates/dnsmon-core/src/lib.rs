// # dnsmon-core
//
// Core library for the DNS mail-security record monitor.
//
// ## Architecture Overview
//
// - **Domain enumeration**: the names queried for a monitored domain
// - **RecordFetcher**: resolves every name for MX, TXT, CNAME and A
// - **Change detection**: diffs two snapshots into NEW/ADDED/REMOVED/DELETED entries
// - **RetryPolicy**: cancellable exponential backoff shared by queries and alerts
// - **DnsMonitor**: the scheduling loop tying the above together
// - **RecordResolver / Notifier / StateStore**: collaborator traits, built by the
//   ComponentRegistry from configuration
//
// ## Design Principles
//
// 1. **Library-First**: the daemon only reads configuration and wires plugins
// 2. **Plugin-Based**: notifiers and state stores are selected by discriminator
// 3. **Owned State**: the previous snapshot is a value passed through each cycle

pub mod config;
pub mod detect;
pub mod domains;
pub mod engine;
pub mod error;
pub mod fetch;
pub mod record;
pub mod registry;
pub mod report;
pub mod retry;
pub mod state;
pub mod traits;

// Re-export core types for convenience
pub use config::{EngineConfig, MonitorConfig, NotifierConfig, ResolverConfig, StateStoreConfig};
pub use detect::{Change, ChangeTag, detect_changes};
pub use domains::{DomainSet, enumerate_domains};
pub use engine::{DnsMonitor, MonitorEvent};
pub use error::{Error, Result};
pub use fetch::{QUERIED_KINDS, RecordFetcher};
pub use record::{DnsRecord, RecordData, RecordKind, Snapshot};
pub use registry::ComponentRegistry;
pub use retry::{RetryError, RetryPolicy};
pub use state::{FileStateStore, MemoryStateStore};
pub use traits::{Notifier, RecordResolver, ResolvedRecord, StateStore};
