// # Notifier Trait
//
// Defines the interface for delivering alerts to the operator.
//
// ## Implementations
//
// - Pushover: `dnsmon-notify-pushover` crate
// - Telegram: `dnsmon-notify-telegram` crate

use async_trait::async_trait;

use crate::config::NotifierConfig;

/// Trait for notifier implementations
///
/// The monitor truncates `title` and `message` to the notifier limits
/// ([`crate::report::TITLE_MAX_CHARS`], [`crate::report::MESSAGE_MAX_CHARS`])
/// before calling [`Notifier::send`].
///
/// ## Allowed
/// - One delivery attempt per call, against the notifier's own endpoint
/// - Returning an error for any failed delivery
///
/// ## Forbidden
/// - Retrying or sleeping (the monitor owns the retry policy)
/// - Spawning tasks
///
/// Failed deliveries are logged by the monitor and never stop a check cycle.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one alert
    async fn send(&self, title: &str, message: &str) -> Result<(), crate::Error>;

    /// Notifier name (for logging and error messages)
    fn notifier_name(&self) -> &'static str;
}

/// Helper trait for constructing notifiers from configuration
pub trait NotifierFactory: Send + Sync {
    /// Create a Notifier instance from configuration
    ///
    /// Factories reject configurations of another type with
    /// [`crate::Error::Config`].
    fn create(&self, config: &NotifierConfig) -> Result<Box<dyn Notifier>, crate::Error>;
}
