//! Contract Test: Shutdown Determinism
//!
//! Constraints verified:
//! - The monitor stops promptly when the token fires during the idle wait
//! - A backoff wait inside a cycle is interrupted by the token
//! - A cancelled fetch never produces an error alert
//! - Exhausted queries are skipped; they neither fail the fetch nor alert
//! - The monitor keeps cycling on every tick until shutdown

mod common;

use common::*;
use dnsmon_core::MonitorEvent;
use dnsmon_core::record::RecordKind;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn shutdown_interrupts_idle_wait() {
    let resolver = ScriptedResolver::new();
    let notifier = RecordingNotifier::new();
    let store = RecordingStateStore::new();
    let (monitor, mut rx) = monitor(minimal_config("example.com"), &resolver, &notifier, &store);

    let cancel = CancellationToken::new();
    let token = cancel.clone();
    let handle = tokio::spawn(async move { monitor.run(token).await });

    // First cycle completes, then the monitor idles for an hour
    wait_for(&mut rx, |e| matches!(e, MonitorEvent::NoChanges { .. })).await;

    cancel.cancel();

    let result = tokio::time::timeout(Duration::from_secs(5), handle).await;
    assert!(result.is_ok(), "Monitor should terminate within 5 seconds");
    let run_result = result.unwrap().unwrap();
    assert!(run_result.is_ok(), "Monitor should shut down cleanly: {run_result:?}");

    let events = drain(&mut rx);
    assert!(events.iter().any(|e| matches!(e, MonitorEvent::Stopped { .. })));
}

#[tokio::test]
async fn shutdown_interrupts_backoff_wait() {
    let resolver = ScriptedResolver::new();
    resolver.fail_everything();
    let notifier = RecordingNotifier::new();
    let store = RecordingStateStore::new();

    let mut config = minimal_config("example.com");
    config.notify_on_errors = true;
    config.engine.query_initial_delay_ms = 60_000;
    let (monitor, mut rx) = monitor(config, &resolver, &notifier, &store);

    let cancel = CancellationToken::new();
    let token = cancel.clone();
    let handle = tokio::spawn(async move { monitor.run(token).await });

    wait_for(&mut rx, |e| matches!(e, MonitorEvent::CycleStarted)).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    cancel.cancel();

    let result = tokio::time::timeout(Duration::from_secs(5), handle).await;
    assert!(result.is_ok(), "Backoff wait should not delay shutdown");
    assert!(result.unwrap().unwrap().is_ok());

    // One attempt, then cancelled during the first backoff
    assert_eq!(resolver.query_count(), 1);
    assert_eq!(notifier.attempts(), 0, "shutdown is not an error worth alerting");

    let events = drain(&mut rx);
    assert!(events.iter().any(|e| matches!(
        e,
        MonitorEvent::FetchFailed { error } if error.contains("cancelled")
    )));
    assert!(store.saves().is_empty());
}

#[tokio::test]
async fn exhausted_queries_do_not_fail_the_fetch_or_alert() {
    let resolver = ScriptedResolver::new();
    resolver.fail_everything();
    let notifier = RecordingNotifier::new();
    let store = RecordingStateStore::new();

    let mut config = minimal_config("example.com");
    config.notify_on_errors = true;
    let (monitor, mut rx) = monitor(config, &resolver, &notifier, &store);
    let cancel = CancellationToken::new();

    let current = monitor
        .check_cycle(dnsmon_core::Snapshot::new(), &cancel)
        .await;

    assert!(current.is_empty());
    // 4 base names x 4 kinds x 3 attempts
    assert_eq!(resolver.query_count(), 48);
    assert_eq!(notifier.attempts(), 0);
    assert_eq!(
        drain(&mut rx),
        vec![
            MonitorEvent::CycleStarted,
            MonitorEvent::NoChanges { records: 0 }
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn every_tick_runs_a_cycle_until_shutdown() {
    let resolver = ScriptedResolver::new();
    resolver.answer(
        "example.com",
        RecordKind::Mx,
        vec![mx("example.com.", 10, "mail.example.com.")],
    );
    let notifier = RecordingNotifier::new();
    let store = RecordingStateStore::new();
    let (monitor, mut rx) = monitor(minimal_config("example.com"), &resolver, &notifier, &store);

    let cancel = CancellationToken::new();
    let token = cancel.clone();
    let handle = tokio::spawn(async move { monitor.run(token).await });

    // Immediate cycle: everything is new
    wait_for(&mut rx, |e| matches!(e, MonitorEvent::StateSaved { .. })).await;

    // Next tick: nothing changed
    wait_for(&mut rx, |e| matches!(e, MonitorEvent::NoChanges { .. })).await;

    // Change the surface before the following tick
    resolver.answer(
        "example.com",
        RecordKind::Mx,
        vec![mx("example.com.", 20, "mail2.example.com.")],
    );
    let events = wait_for(&mut rx, |e| matches!(e, MonitorEvent::StateSaved { .. })).await;
    assert!(events.contains(&MonitorEvent::ChangesDetected {
        changes: vec![
            "ADDED: MX example.com. -> 20 mail2.example.com.".to_string(),
            "REMOVED: MX example.com. -> 10 mail.example.com.".to_string(),
        ]
    }));

    cancel.cancel();
    handle.await.unwrap().unwrap();

    assert_eq!(notifier.sent().len(), 2);
    assert_eq!(store.saves().len(), 2);
}
