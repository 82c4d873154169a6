//! Core monitor loop
//!
//! The DnsMonitor is responsible for:
//! - Loading the last known snapshot at startup
//! - Resolving the query surface on a fixed interval
//! - Diffing each snapshot against the previous one
//! - Alerting through the Notifier and persisting through the StateStore
//!
//! ## Architecture
//!
//! ```text
//!           ┌──────────────┐
//!  tick ───▶│  DnsMonitor  │◀─── shutdown (CancellationToken)
//!           └──────────────┘
//!                  │
//!     ┌────────────┼──────────────┬──────────────┐
//!     ▼            ▼              ▼              ▼
//! ┌─────────┐ ┌──────────┐  ┌──────────┐  ┌─────────────┐
//! │ Fetcher │ │ Detector │  │ Notifier │  │ StateStore  │
//! └─────────┘ └──────────┘  └──────────┘  └─────────────┘
//! ```
//!
//! ## Cycle
//!
//! 1. Fetch the current snapshot
//! 2. Detect changes against the previous snapshot
//! 3. If any: send the change report, save the snapshot, adopt it as previous
//! 4. Otherwise: log only
//!
//! The previous snapshot is passed into and returned from every cycle. A cycle
//! always runs to completion; shutdown only interrupts the wait between cycles
//! and backoff waits inside retries.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::MonitorConfig;
use crate::detect::detect_changes;
use crate::error::{Error, Result};
use crate::fetch::RecordFetcher;
use crate::record::Snapshot;
use crate::report::{self, Report};
use crate::retry::RetryPolicy;
use crate::traits::{Notifier, RecordResolver, StateStore};

/// Events emitted by the DnsMonitor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorEvent {
    /// Monitor started
    Started { domain: String, names: usize },

    /// Previous snapshot loaded at startup
    StateLoaded { records: usize },

    /// Previous snapshot could not be loaded; continuing with an empty one
    StateLoadFailed { error: String },

    /// A check cycle began
    CycleStarted,

    /// The cycle found changes (rendered, sorted)
    ChangesDetected { changes: Vec<String> },

    /// The cycle found nothing new
    NoChanges { records: usize },

    /// An alert was delivered
    NotificationSent { title: String },

    /// An alert could not be delivered
    NotificationFailed { title: String, error: String },

    /// The new snapshot was persisted
    StateSaved { records: usize },

    /// The new snapshot could not be persisted
    StateSaveFailed { error: String },

    /// The cycle could not fetch records at all
    FetchFailed { error: String },

    /// Monitor stopped
    Stopped { reason: String },
}

/// Core DNS monitor
///
/// ## Lifecycle
///
/// 1. Create with [`DnsMonitor::new()`]
/// 2. Start with [`DnsMonitor::run()`]
/// 3. Runs until the cancellation token fires
pub struct DnsMonitor {
    domain: String,

    /// Names queried every cycle
    names: Vec<String>,

    fetcher: RecordFetcher,

    notifier: Box<dyn Notifier>,

    state_store: Box<dyn StateStore>,

    check_interval: Duration,

    /// Alert on load, fetch and save failures
    notify_on_errors: bool,

    notify_retry: RetryPolicy,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<MonitorEvent>,
}

impl DnsMonitor {
    /// Create a new monitor
    ///
    /// # Returns
    ///
    /// A tuple of (monitor, event_receiver) where event_receiver yields monitor events
    pub fn new(
        resolver: Arc<dyn RecordResolver>,
        notifier: Box<dyn Notifier>,
        state_store: Box<dyn StateStore>,
        config: MonitorConfig,
    ) -> Result<(Self, mpsc::Receiver<MonitorEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.engine.event_channel_capacity);

        let monitor = Self {
            names: config.domain_set().enumerate(),
            fetcher: RecordFetcher::new(resolver, config.engine.query_retry()),
            notifier,
            state_store,
            check_interval: config.check_interval(),
            notify_on_errors: config.notify_on_errors,
            notify_retry: config.engine.notify_retry(),
            domain: config.domain,
            event_tx: tx,
        };

        Ok((monitor, rx))
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Names queried every cycle
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Run until `cancel` fires
    ///
    /// Loads the previous snapshot, runs one cycle immediately, then one
    /// cycle per interval tick.
    pub async fn run(&self, cancel: CancellationToken) -> Result<()> {
        info!(
            domain = %self.domain,
            names = self.names.len(),
            interval_secs = self.check_interval.as_secs(),
            notifier = self.notifier.notifier_name(),
            "Starting DNS monitor"
        );
        self.emit_event(MonitorEvent::Started {
            domain: self.domain.clone(),
            names: self.names.len(),
        });

        let mut previous = self.load_state(&cancel).await;
        previous = self.check_cycle(previous, &cancel).await;

        let mut ticker =
            tokio::time::interval_at(Instant::now() + self.check_interval, self.check_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    info!(domain = %self.domain, "Shutdown signal received");
                    break;
                }

                _ = ticker.tick() => {
                    previous = self.check_cycle(previous, &cancel).await;
                }
            }
        }

        self.emit_event(MonitorEvent::Stopped {
            reason: "Shutdown signal".to_string(),
        });
        info!(domain = %self.domain, records = previous.len(), "DNS monitor stopped");

        Ok(())
    }

    /// Load the previous snapshot, falling back to an empty one
    pub async fn load_state(&self, cancel: &CancellationToken) -> Snapshot {
        match self.state_store.load(&self.domain).await {
            Ok(snapshot) => {
                info!(domain = %self.domain, records = snapshot.len(), "Loaded previous state");
                self.emit_event(MonitorEvent::StateLoaded {
                    records: snapshot.len(),
                });
                snapshot
            }
            Err(e) => {
                warn!(domain = %self.domain, error = %e, "Could not load previous state, starting empty");
                self.emit_event(MonitorEvent::StateLoadFailed {
                    error: e.to_string(),
                });
                self.report_error("Failed to load previous state", &e, cancel)
                    .await;
                Snapshot::new()
            }
        }
    }

    /// Run one check against `previous` and return the snapshot to keep
    pub async fn check_cycle(&self, previous: Snapshot, cancel: &CancellationToken) -> Snapshot {
        info!(
            domain = %self.domain,
            interval_secs = self.check_interval.as_secs(),
            "Checking DNS records"
        );
        self.emit_event(MonitorEvent::CycleStarted);

        let current = match self.fetcher.fetch(&self.names, cancel).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                error!(domain = %self.domain, error = %e, "Error fetching DNS records");
                // Per-name failures are skipped by the fetcher; only shutdown ends up here
                self.emit_event(MonitorEvent::FetchFailed {
                    error: e.to_string(),
                });
                return previous;
            }
        };

        debug!(
            domain = %self.domain,
            current = current.len(),
            previous = previous.len(),
            "Comparing snapshots"
        );

        let changes = detect_changes(&previous, &current);
        if changes.is_empty() {
            info!(domain = %self.domain, records = current.len(), "No DNS changes detected");
            self.emit_event(MonitorEvent::NoChanges {
                records: current.len(),
            });
            return previous;
        }

        let rendered: Vec<String> = changes.iter().map(ToString::to_string).collect();
        warn!(domain = %self.domain, changes = rendered.len(), "DNS changes detected");
        for line in &rendered {
            info!(domain = %self.domain, "{}", line);
        }
        self.emit_event(MonitorEvent::ChangesDetected { changes: rendered });

        let alert = report::change_report(&self.domain, &changes, Utc::now());
        // Delivery failure never blocks persistence
        self.notify(alert, cancel).await;

        match self.state_store.save(&self.domain, &current).await {
            Ok(()) => {
                debug!(domain = %self.domain, records = current.len(), "Saved state");
                self.emit_event(MonitorEvent::StateSaved {
                    records: current.len(),
                });
            }
            Err(e) => {
                error!(domain = %self.domain, error = %e, "Failed to save updated state");
                self.emit_event(MonitorEvent::StateSaveFailed {
                    error: e.to_string(),
                });
                self.report_error("Failed to save updated state", &e, cancel)
                    .await;
            }
        }

        current
    }

    /// Send an error report when error notifications are enabled
    async fn report_error(&self, subject: &str, err: &Error, cancel: &CancellationToken) {
        if !self.notify_on_errors || err.is_cancelled() {
            return;
        }
        let alert = report::error_report(subject, err, Utc::now());
        self.notify(alert, cancel).await;
    }

    /// Deliver `alert` through the notification retry policy
    ///
    /// The outcome is logged and emitted as an event.
    async fn notify(&self, alert: Report, cancel: &CancellationToken) {
        let alert = alert.truncated();
        let notifier = self.notifier.notifier_name();

        let outcome = self
            .notify_retry
            .run(cancel, || self.notifier.send(&alert.title, &alert.message))
            .await
            .map_err(Error::from);

        match outcome {
            Ok(()) => {
                info!(notifier, title = %alert.title, "Notification sent");
                self.emit_event(MonitorEvent::NotificationSent {
                    title: alert.title.clone(),
                });
            }
            Err(e) => {
                error!(notifier, title = %alert.title, error = %e, "Error sending notification");
                self.emit_event(MonitorEvent::NotificationFailed {
                    title: alert.title.clone(),
                    error: e.to_string(),
                });
            }
        }
    }

    /// Emit a monitor event
    fn emit_event(&self, event: MonitorEvent) {
        // A closed channel just means nobody is listening
        if let Err(mpsc::error::TrySendError::Full(_)) = self.event_tx.try_send(event) {
            warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monitor_event_equality() {
        let event = MonitorEvent::ChangesDetected {
            changes: vec!["NEW: TXT example.com. -> v=spf1 -all".to_string()],
        };
        assert_eq!(event.clone(), event);
        assert_ne!(event, MonitorEvent::CycleStarted);
    }
}
