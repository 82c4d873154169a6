//! Configuration types for the dnsmon system
//!
//! This module defines all configuration structures used throughout the crate.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::domains::DomainSet;
use crate::retry::RetryPolicy;

/// Longest accepted check interval (one year)
pub const MAX_CHECK_INTERVAL_SECS: u64 = 365 * 24 * 60 * 60;

/// Main monitor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Monitored base domain (e.g. "example.com")
    pub domain: String,

    /// Resolver settings
    #[serde(default)]
    pub resolver: ResolverConfig,

    /// Seconds between check cycles
    #[serde(default = "default_check_interval_secs")]
    pub check_interval_secs: u64,

    /// Send an alert when loading, fetching or saving fails
    #[serde(default)]
    pub notify_on_errors: bool,

    /// Extra subdomain labels, queried as `<label>.<domain>`
    #[serde(default)]
    pub custom_subdomains: Vec<String>,

    /// DKIM selectors, queried as `<selector>._domainkey.<domain>`
    #[serde(default)]
    pub custom_dkim_selectors: Vec<String>,

    /// Fully qualified names queried verbatim
    #[serde(default)]
    pub custom_domains: Vec<String>,

    /// Alert channel
    pub notifier: NotifierConfig,

    /// Where the last snapshot is kept
    #[serde(default)]
    pub state_store: StateStoreConfig,

    /// Optional engine settings
    #[serde(default)]
    pub engine: EngineConfig,
}

impl MonitorConfig {
    /// Create a configuration with defaults for everything but the domain and notifier
    pub fn new(domain: impl Into<String>, notifier: NotifierConfig) -> Self {
        Self {
            domain: domain.into(),
            resolver: ResolverConfig::default(),
            check_interval_secs: default_check_interval_secs(),
            notify_on_errors: false,
            custom_subdomains: Vec::new(),
            custom_dkim_selectors: Vec::new(),
            custom_domains: Vec::new(),
            notifier,
            state_store: StateStoreConfig::default(),
            engine: EngineConfig::default(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.domain.trim().is_empty() {
            return Err(crate::Error::config("Monitored domain cannot be empty"));
        }

        if self.check_interval_secs == 0 {
            return Err(crate::Error::config("Check interval must be > 0"));
        }

        if self.check_interval_secs > MAX_CHECK_INTERVAL_SECS {
            return Err(crate::Error::config(format!(
                "Check interval must be at most {}s, got {}s",
                MAX_CHECK_INTERVAL_SECS, self.check_interval_secs
            )));
        }

        self.resolver.validate()?;
        self.notifier.validate()?;
        self.engine.validate()?;

        Ok(())
    }

    /// Interval between check cycles
    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }

    /// Names to query for this configuration
    pub fn domain_set(&self) -> DomainSet {
        DomainSet::new(self.domain.clone())
            .with_dkim_selectors(self.custom_dkim_selectors.iter().cloned())
            .with_subdomains(self.custom_subdomains.iter().cloned())
            .with_custom_domains(self.custom_domains.iter().cloned())
    }
}

/// Resolver configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Resolver address as `host:port`
    #[serde(default = "default_resolver_address")]
    pub address: String,

    /// Per-exchange timeout in seconds
    #[serde(default = "default_resolver_timeout_secs")]
    pub timeout_secs: u64,
}

impl ResolverConfig {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.address.trim().is_empty() {
            return Err(crate::Error::config("Resolver address cannot be empty"));
        }
        if self.timeout_secs == 0 {
            return Err(crate::Error::config("Resolver timeout must be > 0"));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            address: default_resolver_address(),
            timeout_secs: default_resolver_timeout_secs(),
        }
    }
}

/// Notifier configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotifierConfig {
    /// Pushover push notifications
    Pushover {
        /// Application API token
        app_token: String,
        /// Recipient user key
        user_key: String,
    },

    /// Telegram bot messages
    Telegram {
        /// Bot API token
        bot_token: String,
        /// Chats that receive every alert
        chat_ids: Vec<i64>,
    },

    /// Custom notifier
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl NotifierConfig {
    /// Validate the notifier configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            NotifierConfig::Pushover {
                app_token,
                user_key,
            } => {
                if app_token.is_empty() || user_key.is_empty() {
                    return Err(crate::Error::config(
                        "Pushover app token and user key are required",
                    ));
                }
                Ok(())
            }
            NotifierConfig::Telegram {
                bot_token,
                chat_ids,
            } => {
                if bot_token.is_empty() {
                    return Err(crate::Error::config("Telegram bot token is required"));
                }
                if chat_ids.is_empty() {
                    return Err(crate::Error::config(
                        "At least one Telegram chat id is required",
                    ));
                }
                Ok(())
            }
            NotifierConfig::Custom { factory, .. } => {
                if factory.is_empty() {
                    return Err(crate::Error::config(
                        "Custom notifier factory cannot be empty",
                    ));
                }
                Ok(())
            }
        }
    }

    /// Get the notifier type name
    pub fn type_name(&self) -> &str {
        match self {
            NotifierConfig::Pushover { .. } => "pushover",
            NotifierConfig::Telegram { .. } => "telegram",
            NotifierConfig::Custom { factory, .. } => factory,
        }
    }
}

impl fmt::Debug for NotifierConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotifierConfig::Pushover { .. } => f
                .debug_struct("Pushover")
                .field("app_token", &"<redacted>")
                .field("user_key", &"<redacted>")
                .finish(),
            NotifierConfig::Telegram { chat_ids, .. } => f
                .debug_struct("Telegram")
                .field("bot_token", &"<redacted>")
                .field("chat_ids", chat_ids)
                .finish(),
            NotifierConfig::Custom { factory, .. } => f
                .debug_struct("Custom")
                .field("factory", factory)
                .field("config", &"<redacted>")
                .finish(),
        }
    }
}

/// State store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StateStoreConfig {
    /// One JSON document per domain under `dir`
    File {
        /// Directory holding the state documents
        #[serde(default = "default_state_dir")]
        dir: String,
    },

    /// In-memory state store (not persistent)
    Memory,

    /// Custom state store
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl StateStoreConfig {
    /// Get the state store type name
    pub fn type_name(&self) -> &str {
        match self {
            StateStoreConfig::File { .. } => "file",
            StateStoreConfig::Memory => "memory",
            StateStoreConfig::Custom { factory, .. } => factory,
        }
    }
}

impl Default for StateStoreConfig {
    fn default() -> Self {
        StateStoreConfig::File {
            dir: default_state_dir(),
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Attempts per DNS query
    #[serde(default = "default_query_max_attempts")]
    pub query_max_attempts: usize,

    /// First backoff delay for DNS queries (in milliseconds)
    #[serde(default = "default_initial_delay_ms")]
    pub query_initial_delay_ms: u64,

    /// Attempts per notification
    #[serde(default = "default_notify_max_attempts")]
    pub notify_max_attempts: usize,

    /// First backoff delay for notifications (in milliseconds)
    #[serde(default = "default_initial_delay_ms")]
    pub notify_initial_delay_ms: u64,

    /// Capacity of the monitor event channel
    ///
    /// When full, new events are dropped (with a warning log).
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.query_max_attempts == 0 || self.notify_max_attempts == 0 {
            return Err(crate::Error::config("Retry attempts must be > 0"));
        }
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("Event channel capacity must be > 0"));
        }
        Ok(())
    }

    /// Retry policy for DNS queries
    pub fn query_retry(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.query_max_attempts,
            Duration::from_millis(self.query_initial_delay_ms),
        )
    }

    /// Retry policy for notification delivery
    pub fn notify_retry(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.notify_max_attempts,
            Duration::from_millis(self.notify_initial_delay_ms),
        )
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            query_max_attempts: default_query_max_attempts(),
            query_initial_delay_ms: default_initial_delay_ms(),
            notify_max_attempts: default_notify_max_attempts(),
            notify_initial_delay_ms: default_initial_delay_ms(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

fn default_check_interval_secs() -> u64 {
    3600
}

fn default_resolver_address() -> String {
    "1.1.1.1:53".to_string()
}

fn default_resolver_timeout_secs() -> u64 {
    5
}

fn default_state_dir() -> String {
    "data".to_string()
}

fn default_query_max_attempts() -> usize {
    3
}

fn default_notify_max_attempts() -> usize {
    5
}

fn default_initial_delay_ms() -> u64 {
    500
}

fn default_event_channel_capacity() -> usize {
    100
}
