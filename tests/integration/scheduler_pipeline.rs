//! End-to-end tests of the tick pipeline
//!
//! Scheduler → Monitor → store and evaluator → events → storage actor

use std::time::Duration;

use host_monitor::{
    actors::{SchedulerHandle, StorageHandle},
    alerts::{AlertStatus, Metric, Threshold},
    storage::MemoryBackend,
    store::{DiskSelection, TimeRange},
};
use pretty_assertions::assert_eq;

use crate::helpers::*;

#[tokio::test]
async fn test_cpu_crossing_produces_exactly_two_transitions() {
    let monitor = create_monitor(100, vec![cpu_threshold(80.0)]);
    let mut alerts = monitor.subscribe_alerts();

    let sampler = ScriptedSampler::new([
        create_sample(1, 70.0),
        create_sample(2, 85.0),
        create_sample(3, 90.0),
        create_sample(4, 75.0),
    ]);
    let scheduler = SchedulerHandle::spawn(sampler, monitor.clone(), Duration::from_secs(3600));

    let mut reports = Vec::new();
    for _ in 0..4 {
        reports.push(scheduler.tick_now().await.unwrap());
    }

    let transition_counts: Vec<usize> = reports.iter().map(|r| r.transitions.len()).collect();
    assert_eq!(transition_counts, vec![0, 1, 0, 1]);

    let triggered = alerts.recv().await.unwrap();
    assert_eq!(triggered.status, AlertStatus::Triggered);
    assert_eq!(triggered.since, at(2));
    assert_eq!(triggered.value, 85.0);

    let cleared = alerts.recv().await.unwrap();
    assert_eq!(cleared.status, AlertStatus::Normal);
    assert_eq!(cleared.since, at(4));
    assert!(alerts.try_recv().is_err());

    let states = monitor.alert_states().await;
    assert_eq!(states.len(), 1);
    assert_eq!(states[0].status, AlertStatus::Normal);
    assert_eq!(states[0].since, Some(at(4)));

    scheduler.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_retention_keeps_newest_samples() {
    let monitor = create_monitor(3, vec![]);
    let sampler = ScriptedSampler::new((1..=5).map(|secs| create_sample(secs, 10.0)));
    let scheduler = SchedulerHandle::spawn(sampler, monitor.clone(), Duration::from_secs(3600));

    for _ in 0..5 {
        scheduler.tick_now().await.unwrap();
    }

    let history = monitor.history(TimeRange::all(), None).await.unwrap();
    let timestamps: Vec<_> = history.iter().map(|s| s.timestamp).collect();
    assert_eq!(timestamps, vec![at(3), at(4), at(5)]);

    let stats = monitor.stats().await;
    assert_eq!(stats.total_appended, 5);
    assert_eq!(stats.total_evicted, 2);

    scheduler.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_disk_threshold_and_visible_disks() {
    let monitor = create_monitor(100, vec![]);
    let sampler = ScriptedSampler::new([create_sample(1, 10.0), create_sample(2, 10.0)]);
    let scheduler = SchedulerHandle::spawn(sampler, monitor.clone(), Duration::from_secs(3600));

    scheduler.tick_now().await.unwrap();

    monitor
        .put_threshold(Threshold::new(Metric::disk("/data"), 85.0))
        .await
        .unwrap();
    monitor
        .put_visible_disks(DiskSelection::only(["/"]))
        .await
        .unwrap();

    let report = scheduler.tick_now().await.unwrap();
    assert_eq!(report.transitions.len(), 1);
    assert_eq!(report.transitions[0].threshold.metric, Metric::disk("/data"));

    // the default selection hides /data, an explicit one shows it
    let visible = monitor.history(TimeRange::all(), None).await.unwrap();
    assert!(visible.iter().all(|s| s.disks.keys().eq(["/"])));

    let explicit = monitor
        .history(TimeRange::since(at(2)), Some(DiskSelection::only(["/data"])))
        .await
        .unwrap();
    assert_eq!(explicit.len(), 1);
    assert!(explicit[0].disks.contains_key("/data"));

    scheduler.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_samples_reach_storage_actor() {
    let monitor = create_monitor(100, vec![cpu_threshold(80.0)]);
    let storage = StorageHandle::spawn(
        monitor.subscribe_samples(),
        Box::new(MemoryBackend::new()),
        None,
    );
    let sampler = ScriptedSampler::new((1..=3).map(|secs| create_sample(secs, 10.0)));
    let scheduler = SchedulerHandle::spawn(sampler, monitor.clone(), Duration::from_secs(3600));

    for _ in 0..3 {
        scheduler.tick_now().await.unwrap();
    }

    // give the storage actor a chance to drain its subscription
    tokio::time::sleep(Duration::from_millis(50)).await;
    storage.flush().await.unwrap();

    let persisted = storage.query_latest(10).await.unwrap();
    let timestamps: Vec<_> = persisted.iter().map(|r| r.timestamp).collect();
    assert_eq!(timestamps, vec![at(1), at(2), at(3)]);

    let stats = storage.get_stats().await.unwrap();
    assert_eq!(stats.total_persisted, 3);

    scheduler.shutdown().await.unwrap();
    storage.shutdown().await;
}

#[tokio::test]
async fn test_timer_drives_ticks() {
    let monitor = create_monitor(100, vec![]);
    let mut samples = monitor.subscribe_samples();
    let sampler = ScriptedSampler::new((1..=3).map(|secs| create_sample(secs, 10.0)));
    let scheduler = SchedulerHandle::spawn(sampler, monitor.clone(), Duration::from_millis(10));

    for expected in 1..=3 {
        let event = tokio::time::timeout(Duration::from_secs(5), samples.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.sample.timestamp, at(expected));
    }

    scheduler.shutdown().await.unwrap();
}
