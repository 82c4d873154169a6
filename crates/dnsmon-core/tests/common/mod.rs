//! Test doubles and common utilities for monitor contract tests
//!
//! Every double shares its state through `Arc`s so a test can keep a handle
//! after boxing the double into the monitor.

#![allow(dead_code)]

use dnsmon_core::config::{EngineConfig, MonitorConfig, NotifierConfig, StateStoreConfig};
use dnsmon_core::error::{Error, Result};
use dnsmon_core::record::{RecordData, RecordKind, Snapshot};
use dnsmon_core::traits::{Notifier, RecordResolver, ResolvedRecord, StateStore};
use dnsmon_core::{DnsMonitor, MonitorEvent};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// A resolver answering from a table the test can rewrite between cycles
///
/// Pairs missing from the table answer with no records.
#[derive(Clone, Default)]
pub struct ScriptedResolver {
    answers: Arc<Mutex<HashMap<(String, RecordKind), Vec<ResolvedRecord>>>>,
    failing: Arc<Mutex<Vec<(String, RecordKind)>>>,
    fail_everything: Arc<Mutex<bool>>,
    query_count: Arc<AtomicUsize>,
}

impl ScriptedResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the answer for `(name, kind)`
    pub fn answer(&self, name: &str, kind: RecordKind, records: Vec<ResolvedRecord>) {
        self.answers
            .lock()
            .unwrap()
            .insert((name.to_string(), kind), records);
    }

    /// Make `(name, kind)` fail at the transport level
    pub fn fail(&self, name: &str, kind: RecordKind) {
        self.failing.lock().unwrap().push((name.to_string(), kind));
    }

    /// Make every query fail at the transport level
    pub fn fail_everything(&self) {
        *self.fail_everything.lock().unwrap() = true;
    }

    pub fn query_count(&self) -> usize {
        self.query_count.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl RecordResolver for ScriptedResolver {
    async fn query(&self, name: &str, kind: &RecordKind) -> Result<Vec<ResolvedRecord>> {
        self.query_count.fetch_add(1, Ordering::SeqCst);
        let key = (name.to_string(), kind.clone());

        if *self.fail_everything.lock().unwrap() || self.failing.lock().unwrap().contains(&key) {
            return Err(Error::query(name, kind.clone(), "i/o timeout"));
        }

        Ok(self
            .answers
            .lock()
            .unwrap()
            .get(&key)
            .cloned()
            .unwrap_or_default())
    }

    fn resolver_name(&self) -> &'static str {
        "scripted"
    }
}

/// A notifier recording every delivery attempt
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<(String, String)>>>,
    attempts: Arc<AtomicUsize>,
    failures_remaining: Arc<AtomicUsize>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `n` delivery attempts
    pub fn fail_next(&self, n: usize) {
        self.failures_remaining.store(n, Ordering::SeqCst);
    }

    /// Successfully delivered `(title, message)` pairs
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, title: &str, message: &str) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        let remaining = self.failures_remaining.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures_remaining.store(remaining - 1, Ordering::SeqCst);
            return Err(Error::notifier("recording", "status 503"));
        }

        self.sent
            .lock()
            .unwrap()
            .push((title.to_string(), message.to_string()));
        Ok(())
    }

    fn notifier_name(&self) -> &'static str {
        "recording"
    }
}

/// A state store recording saves, with injectable failures
#[derive(Clone, Default)]
pub struct RecordingStateStore {
    stored: Arc<Mutex<Option<Snapshot>>>,
    saves: Arc<Mutex<Vec<Snapshot>>>,
    fail_load: Arc<Mutex<bool>>,
    fail_save: Arc<Mutex<bool>>,
}

impl RecordingStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with `snapshot` already stored
    pub fn with_stored(snapshot: Snapshot) -> Self {
        let store = Self::new();
        *store.stored.lock().unwrap() = Some(snapshot);
        store
    }

    pub fn fail_load(&self) {
        *self.fail_load.lock().unwrap() = true;
    }

    pub fn fail_save(&self) {
        *self.fail_save.lock().unwrap() = true;
    }

    /// Every snapshot passed to a successful save
    pub fn saves(&self) -> Vec<Snapshot> {
        self.saves.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl StateStore for RecordingStateStore {
    async fn load(&self, _domain: &str) -> Result<Snapshot> {
        if *self.fail_load.lock().unwrap() {
            return Err(Error::state_store("Failed to parse state file: expected value"));
        }
        Ok(self.stored.lock().unwrap().clone().unwrap_or_default())
    }

    async fn save(&self, _domain: &str, snapshot: &Snapshot) -> Result<()> {
        if *self.fail_save.lock().unwrap() {
            return Err(Error::state_store("read-only file system"));
        }
        *self.stored.lock().unwrap() = Some(snapshot.clone());
        self.saves.lock().unwrap().push(snapshot.clone());
        Ok(())
    }
}

/// Minimal configuration with fast retries and a long interval
pub fn minimal_config(domain: &str) -> MonitorConfig {
    let mut config = MonitorConfig::new(
        domain,
        NotifierConfig::Custom {
            factory: "recording".to_string(),
            config: serde_json::Value::Null,
        },
    );
    config.state_store = StateStoreConfig::Memory;
    config.check_interval_secs = 3600;
    config.engine = EngineConfig {
        query_max_attempts: 3,
        query_initial_delay_ms: 1,
        notify_max_attempts: 5,
        notify_initial_delay_ms: 1,
        event_channel_capacity: 100,
    };
    config
}

/// Build a monitor from the doubles
pub fn monitor(
    config: MonitorConfig,
    resolver: &ScriptedResolver,
    notifier: &RecordingNotifier,
    store: &RecordingStateStore,
) -> (DnsMonitor, mpsc::Receiver<MonitorEvent>) {
    DnsMonitor::new(
        Arc::new(resolver.clone()),
        Box::new(notifier.clone()),
        Box::new(store.clone()),
        config,
    )
    .expect("monitor construction succeeds")
}

pub fn mx(owner: &str, preference: u16, exchange: &str) -> ResolvedRecord {
    ResolvedRecord::new(
        owner,
        300,
        RecordData::Mx {
            preference,
            exchange: exchange.to_string(),
        },
    )
}

pub fn txt(owner: &str, text: &str) -> ResolvedRecord {
    ResolvedRecord::new(owner, 300, RecordData::Txt(vec![text.to_string()]))
}

/// Drain every event currently queued
pub fn drain(rx: &mut mpsc::Receiver<MonitorEvent>) -> Vec<MonitorEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Wait for the first event matching `pred`, collecting everything before it
pub async fn wait_for<F>(rx: &mut mpsc::Receiver<MonitorEvent>, pred: F) -> Vec<MonitorEvent>
where
    F: Fn(&MonitorEvent) -> bool,
{
    let mut seen = Vec::new();
    while let Some(event) = rx.recv().await {
        let done = pred(&event);
        seen.push(event);
        if done {
            return seen;
        }
    }
    panic!("event channel closed before the expected event; saw {seen:?}");
}
