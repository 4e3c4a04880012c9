//! Concurrency tests
//!
//! Readers running alongside the single writer always see a consistent
//! window, and settings changes never interleave with a tick.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use host_monitor::{
    actors::SchedulerHandle,
    alerts::{AlertStatus, Metric, Threshold},
    store::TimeRange,
};

use crate::helpers::*;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_readers_see_ordered_bounded_history() {
    let monitor = create_monitor(20, vec![cpu_threshold(50.0)]);
    let sampler = ScriptedSampler::new((1..=200).map(|secs| create_sample(secs, (secs % 100) as f32)));
    let scheduler = SchedulerHandle::spawn(sampler, monitor.clone(), Duration::from_secs(3600));

    let done = Arc::new(AtomicBool::new(false));

    let mut readers = Vec::new();
    for _ in 0..4 {
        let monitor = monitor.clone();
        let done = done.clone();
        readers.push(tokio::spawn(async move {
            let mut checks = 0usize;
            while !done.load(Ordering::SeqCst) {
                let history = monitor.history(TimeRange::all(), None).await.unwrap();
                assert!(history.len() <= 20);
                assert!(history.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
                let _ = monitor.alert_states().await;
                checks += 1;
                tokio::task::yield_now().await;
            }
            checks
        }));
    }

    for _ in 0..200 {
        scheduler.tick_now().await.unwrap();
    }
    done.store(true, Ordering::SeqCst);

    for reader in readers {
        assert!(reader.await.unwrap() > 0);
    }

    let stats = monitor.stats().await;
    assert_eq!(stats.retained, 20);
    assert_eq!(stats.newest, Some(at(200)));

    scheduler.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_threshold_updates_during_ticks() {
    let monitor = create_monitor(50, vec![]);
    let sampler = ScriptedSampler::new((1..=100).map(|secs| create_sample(secs, 90.0)));
    let scheduler = SchedulerHandle::spawn(sampler, monitor.clone(), Duration::from_secs(3600));
    let mut alerts = monitor.subscribe_alerts();

    let writer = {
        let monitor = monitor.clone();
        tokio::spawn(async move {
            for _ in 0..20 {
                monitor
                    .put_threshold(Threshold::new(Metric::Cpu, 80.0))
                    .await
                    .unwrap();
                tokio::task::yield_now().await;
                monitor.delete_threshold(&Metric::Cpu).await.unwrap();
            }
            monitor
                .put_threshold(Threshold::new(Metric::Cpu, 80.0))
                .await
                .unwrap();
        })
    };

    for _ in 0..100 {
        scheduler.tick_now().await.unwrap();
    }
    writer.await.unwrap();

    // a removed threshold restarts from normal, so every trigger is fresh
    while let Ok(transition) = alerts.try_recv() {
        assert_eq!(transition.status, AlertStatus::Triggered);
    }

    let states = monitor.alert_states().await;
    assert_eq!(states.len(), 1);

    scheduler.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_concurrent_tick_requests_are_serialized() {
    let monitor = create_monitor(100, vec![]);
    let sampler = ScriptedSampler::new((1..=10).map(|secs| create_sample(secs, 10.0)));
    let scheduler = SchedulerHandle::spawn(sampler, monitor.clone(), Duration::from_secs(3600));

    let mut tasks = Vec::new();
    for _ in 0..10 {
        let scheduler = scheduler.clone();
        tasks.push(tokio::spawn(async move { scheduler.tick_now().await }));
    }

    for task in tasks {
        assert!(task.await.unwrap().is_ok());
    }

    assert_eq!(monitor.stats().await.retained, 10);
    assert_eq!(monitor.stats().await.total_rejected, 0);

    scheduler.shutdown().await.unwrap();
}
